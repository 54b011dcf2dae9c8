//! Deterministic rule-based recommendations.
//!
//! Derived entirely from the life-path number and zodiac sign via fixed
//! lookup tables — no network, no randomness. This is the fallback whenever
//! the AI collaborator is unavailable, and the authoritative behavior the
//! enrichment tests pin down.

use std::collections::BTreeMap;

use crate::enrichment::{
    power_periods, Category, DateAdvice, EnrichmentRequest, Recommendations,
    POWER_PERIOD_MAX_GAP_DAYS,
};
use crate::numerology;
use crate::zodiac::{Element, ZodiacSign};

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedProvider;

impl RuleBasedProvider {
    pub fn recommend(&self, req: &EnrichmentRequest<'_>) -> Recommendations {
        if req.dates.is_empty() {
            return Recommendations::default();
        }

        let mut date_specific_advice = BTreeMap::new();
        for date in req.dates {
            if let Some((month, day)) = month_day(date) {
                date_specific_advice.insert(
                    date.clone(),
                    advise_date(month, day, req.life_path, req.sign),
                );
            }
        }

        let high_power: Vec<String> = date_specific_advice
            .iter()
            .filter(|(_, advice)| advice.power_level > 1)
            .map(|(date, _)| date.clone())
            .collect();

        Recommendations {
            career: vec![
                format!("Use your Life Path {} energy for career advancement", req.life_path),
                "Focus on leadership and initiative during power periods".to_string(),
                "Schedule important meetings during high-energy dates".to_string(),
            ],
            personal: vec![
                format!("Align personal goals with {}'s natural strengths", req.sign.name),
                "Use power dates for important personal decisions".to_string(),
                "Focus on relationships during harmonious periods".to_string(),
            ],
            rest: vec![
                "Take advantage of natural energy dips for rejuvenation".to_string(),
                "Plan vacations during favorable date clusters".to_string(),
                "Use quiet periods for reflection and planning".to_string(),
            ],
            financial: vec![
                "Make major financial decisions on power dates".to_string(),
                "Plan investments during auspicious periods".to_string(),
                "Review finances during clear-minded phases".to_string(),
            ],
            power_periods: power_periods(&high_power, POWER_PERIOD_MAX_GAP_DAYS),
            date_specific_advice,
        }
    }
}

fn month_day(date: &str) -> Option<(u32, u32)> {
    let mut parts = date.split('-');
    let _year = parts.next()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    Some((month, day))
}

fn advise_date(month: u32, day: u32, life_path: u64, sign: &'static ZodiacSign) -> DateAdvice {
    DateAdvice {
        activities: date_activities(day, life_path, sign),
        timing: Some(optimal_timing(sign).to_string()),
        power_level: power_level(month, day, life_path),
        category: date_category(day),
    }
}

/// Time-of-day preference by sign, from the classical temperament readings.
fn optimal_timing(sign: &ZodiacSign) -> &'static str {
    match sign.name {
        "Aries" => "morning",
        "Taurus" => "mid-morning",
        "Gemini" => "afternoon",
        "Cancer" => "evening",
        "Leo" => "noon",
        "Virgo" => "morning",
        "Libra" => "afternoon",
        "Scorpio" => "evening",
        "Sagittarius" => "morning",
        "Capricorn" => "early morning",
        "Aquarius" => "afternoon",
        _ => "evening", // Pisces
    }
}

/// Base power 1, +1 when the day+month digit number matches the life path,
/// +1 again when the day of month itself equals it.
fn power_level(month: u32, day: u32, life_path: u64) -> u8 {
    let date_number = numerology::reduce((day + month) as u64, true);
    let mut power = 1u8;
    if date_number == life_path {
        power += 1;
    }
    if day as u64 == life_path {
        power += 1;
    }
    power
}

fn date_category(day: u32) -> Category {
    match day % 4 {
        0 => Category::Career,
        1 => Category::Personal,
        2 => Category::Rest,
        _ => Category::Financial,
    }
}

fn date_activities(day: u32, life_path: u64, sign: &'static ZodiacSign) -> Vec<String> {
    let mut activities = Vec::new();

    if life_path > 0 && day as u64 % life_path == 0 {
        activities.push(format!(
            "Excellent day for {}-aligned projects requiring focus and determination",
            sign.name
        ));
    }

    let position = if day <= 10 {
        "Start new initiatives and plan ahead"
    } else if day <= 20 {
        "Execute ongoing projects and maintain momentum"
    } else {
        "Complete tasks and reflect on achievements"
    };
    activities.push(position.to_string());

    activities.push(
        match sign.element {
            Element::Fire => "Take bold action and lead initiatives",
            Element::Earth => "Focus on practical and material matters",
            Element::Air => "Engage in communication and learning",
            Element::Water => "Focus on emotional and intuitive work",
        }
        .to_string(),
    );

    activities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zodiac;

    fn request<'a>(dates: &'a [String]) -> EnrichmentRequest<'a> {
        EnrichmentRequest {
            birth_date: "1990-01-01",
            life_path: 3,
            sign: zodiac::sign_for(1, 1), // Capricorn
            dates,
        }
    }

    #[test]
    fn empty_dates_produce_empty_recommendations() {
        let dates: Vec<String> = Vec::new();
        let recs = RuleBasedProvider.recommend(&request(&dates));
        assert!(recs.is_vacant());
        assert!(recs.power_periods.is_empty());
    }

    #[test]
    fn output_is_deterministic() {
        let dates = vec!["2024-01-03".to_string(), "2024-01-12".to_string()];
        let req = request(&dates);
        assert_eq!(
            RuleBasedProvider.recommend(&req),
            RuleBasedProvider.recommend(&req)
        );
    }

    #[test]
    fn category_texts_reference_profile() {
        let dates = vec!["2024-01-03".to_string()];
        let recs = RuleBasedProvider.recommend(&request(&dates));
        assert!(recs.career[0].contains("Life Path 3"));
        assert!(recs.personal[0].contains("Capricorn"));
        assert_eq!(recs.rest.len(), 3);
        assert_eq!(recs.financial.len(), 3);
    }

    #[test]
    fn power_level_formula() {
        // life path 3: month 1 day 2 → 1+2=3 matches (+1); day 2 ≠ 3 → 2
        assert_eq!(power_level(1, 2, 3), 2);
        // day 3 == life path and 1+3=4 ≠ 3 → 2
        assert_eq!(power_level(1, 3, 3), 2);
        // month 1 day 11 → 12 → 3 matches, day 11 ≠ 3 → 2
        assert_eq!(power_level(1, 11, 3), 2);
        // month 9 day 3: 12 → 3 matches and day 3 matches → 3
        assert_eq!(power_level(9, 3, 3), 3);
        // no match at all → 1
        assert_eq!(power_level(1, 4, 3), 1);
    }

    #[test]
    fn categories_cycle_with_day_of_month() {
        assert_eq!(date_category(4), Category::Career);
        assert_eq!(date_category(5), Category::Personal);
        assert_eq!(date_category(6), Category::Rest);
        assert_eq!(date_category(7), Category::Financial);
    }

    #[test]
    fn advice_carries_timing_and_element_activity() {
        let dates = vec!["2024-01-03".to_string()];
        let recs = RuleBasedProvider.recommend(&request(&dates));
        let advice = &recs.date_specific_advice["2024-01-03"];
        assert_eq!(advice.timing.as_deref(), Some("early morning")); // Capricorn
        assert!(advice
            .activities
            .iter()
            .any(|a| a == "Focus on practical and material matters")); // Earth
        // Day 3 with life path 3 also gets the aligned-projects line.
        assert!(advice.activities[0].contains("Capricorn-aligned"));
    }

    #[test]
    fn high_power_clusters_become_power_periods() {
        // life path 3; pick days where power_level > 1 and they sit close:
        // 2024-09-03 (12→3, day 3) → 3; 2024-09-06 isn't (15→6, day 6) → 1;
        // use 2024-01-02 (3) and 2024-01-03 (day 3) both level 2, 1 day apart.
        let dates = vec![
            "2024-01-02".to_string(),
            "2024-01-03".to_string(),
            "2024-06-18".to_string(), // 24→6, day 18: level 1, ignored
        ];
        let recs = RuleBasedProvider.recommend(&request(&dates));
        assert_eq!(recs.power_periods.len(), 1);
        assert_eq!(recs.power_periods[0].dates.len(), 2);
        assert_eq!(recs.power_periods[0].start_date, "2024-01-02");
        assert_eq!(recs.power_periods[0].end_date, "2024-01-03");
    }
}
