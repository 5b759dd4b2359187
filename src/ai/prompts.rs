//! Static prompt templates

use crate::store::ProfileFields;

const COACH_PERSONA: &str = "You are BodyPilot, a friendly and knowledgeable fitness and \
nutrition coach. Give safe, practical advice. Do not diagnose medical conditions; suggest \
seeing a professional when something sounds like an injury or illness.";

pub fn chat_system(profile: &ProfileFields) -> String {
    format!(
        "{}\nKeep answers concise (under 200 words) unless asked for detail.\n{}",
        COACH_PERSONA,
        profile_block(profile)
    )
}

pub fn workout_system(profile: &ProfileFields) -> String {
    format!(
        "{}\nYou write structured weekly workout plans in Markdown. For each training day list \
the exercises with sets, reps and rest. Include a short warm-up and cool-down.\n{}",
        COACH_PERSONA,
        profile_block(profile)
    )
}

pub fn workout_user(
    days_per_week: u8,
    focus: Option<&str>,
    equipment: &[String],
    session_minutes: Option<u32>,
) -> String {
    let mut prompt = format!(
        "Create a workout plan with {} training days per week.",
        days_per_week
    );
    if let Some(focus) = focus {
        prompt.push_str(&format!(" Focus: {}.", focus));
    }
    if equipment.is_empty() {
        prompt.push_str(" Assume bodyweight only.");
    } else {
        prompt.push_str(&format!(" Available equipment: {}.", equipment.join(", ")));
    }
    if let Some(minutes) = session_minutes {
        prompt.push_str(&format!(" Each session should take about {} minutes.", minutes));
    }
    prompt
}

pub fn meal_system(profile: &ProfileFields) -> String {
    format!(
        "{}\nYou write meal plans in Markdown. For each day list breakfast, lunch, dinner and \
snacks with approximate calories and protein.\n{}",
        COACH_PERSONA,
        profile_block(profile)
    )
}

pub fn meal_user(days: u8, calories_target: Option<u32>, preferences: Option<&str>) -> String {
    let mut prompt = format!("Create a {}-day meal plan.", days);
    if let Some(calories) = calories_target {
        prompt.push_str(&format!(" Target about {} kcal per day.", calories));
    }
    if let Some(preferences) = preferences {
        prompt.push_str(&format!(" Preferences: {}.", preferences));
    }
    prompt
}

pub fn translate_system(target_language: &str) -> String {
    format!(
        "Translate the user's text into {}. Keep Markdown formatting, numbers and units \
unchanged. Reply with the translation only.",
        target_language
    )
}

pub fn nutrition_system() -> String {
    "You estimate the nutrition of a described meal. Reply with estimated calories, protein, \
carbohydrates and fat in grams, one per line, followed by a one-sentence note on the \
assumptions you made."
        .to_string()
}

fn profile_block(profile: &ProfileFields) -> String {
    let mut lines = Vec::new();
    if let Some(name) = &profile.display_name {
        lines.push(format!("Name: {}", name));
    }
    if let Some(goal) = &profile.goal {
        lines.push(format!("Goal: {}", goal));
    }
    if let Some(level) = &profile.experience_level {
        lines.push(format!("Experience: {}", level));
    }
    if let Some(age) = profile.age {
        lines.push(format!("Age: {}", age));
    }
    if let Some(sex) = &profile.sex {
        lines.push(format!("Sex: {}", sex));
    }
    if let Some(weight) = profile.weight_kg {
        lines.push(format!("Weight: {:.1} kg", weight));
    }
    if let Some(height) = profile.height_cm {
        lines.push(format!("Height: {:.0} cm", height));
    }
    if let Some(diet) = &profile.dietary_preference {
        lines.push(format!("Diet: {}", diet));
    }

    if lines.is_empty() {
        "The user has not shared profile details.".to_string()
    } else {
        format!("User profile:\n{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_block_lists_known_fields() {
        let profile = ProfileFields {
            goal: Some("lose fat".to_string()),
            weight_kg: Some(82.5),
            ..Default::default()
        };
        let prompt = chat_system(&profile);
        assert!(prompt.contains("Goal: lose fat"));
        assert!(prompt.contains("Weight: 82.5 kg"));
        assert!(!prompt.contains("Age:"));
    }

    #[test]
    fn test_empty_profile() {
        let prompt = meal_system(&ProfileFields::default());
        assert!(prompt.contains("has not shared profile details"));
    }

    #[test]
    fn test_workout_user_prompt() {
        let prompt = workout_user(3, Some("strength"), &[], Some(45));
        assert!(prompt.contains("3 training days"));
        assert!(prompt.contains("bodyweight only"));
        assert!(prompt.contains("45 minutes"));

        let prompt = workout_user(4, None, &["barbell".to_string(), "bench".to_string()], None);
        assert!(prompt.contains("barbell, bench"));
    }
}
