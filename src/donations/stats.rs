use serde::Serialize;

use super::repo::{Donation, DonationStatus};

/// 0.35 kg of CO₂ avoided per serving kept out of landfill.
pub const CO2_KG_PER_SERVING: f64 = 0.35;
/// Impact score grows 10 points per listed donation, capped at 89.
pub const IMPACT_SCORE_WEIGHT: i64 = 10;
pub const IMPACT_SCORE_CAP: i64 = 89;

/// The dashboard stats panel, computed from the live donation list on
/// every request. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactStats {
    pub meals_saved: i64,
    pub active_donations: i64,
    pub co2_reduced_kg: f64,
    pub impact_score: i64,
}

pub fn compute(donations: &[Donation]) -> ImpactStats {
    let meals_saved: i64 = donations.iter().map(|d| d.quantity).sum();
    let active_donations = donations
        .iter()
        .filter(|d| d.status == DonationStatus::Active)
        .count() as i64;
    ImpactStats {
        meals_saved,
        active_donations,
        co2_reduced_kg: meals_saved as f64 * CO2_KG_PER_SERVING,
        impact_score: (donations.len() as i64 * IMPACT_SCORE_WEIGHT).min(IMPACT_SCORE_CAP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn donation(quantity: i64, status: DonationStatus) -> Donation {
        Donation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            food_type: "Packed meals".into(),
            quantity,
            pickup_location: "Bandra".into(),
            expires_at: OffsetDateTime::now_utc(),
            description: None,
            status,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn empty_list_yields_zeroes() {
        let stats = compute(&[]);
        assert_eq!(stats.meals_saved, 0);
        assert_eq!(stats.active_donations, 0);
        assert_eq!(stats.co2_reduced_kg, 0.0);
        assert_eq!(stats.impact_score, 0);
    }

    #[test]
    fn meals_saved_is_the_sum_of_quantities() {
        let list = vec![
            donation(25, DonationStatus::PickedUp),
            donation(50, DonationStatus::Active),
            donation(30, DonationStatus::Delivered),
        ];
        let stats = compute(&list);
        assert_eq!(stats.meals_saved, 105);
        assert_eq!(stats.active_donations, 1);
        assert!((stats.co2_reduced_kg - 105.0 * CO2_KG_PER_SERVING).abs() < f64::EPSILON);
    }

    #[test]
    fn meals_saved_never_decreases_as_records_are_added() {
        let mut list = Vec::new();
        let mut previous = 0;
        for quantity in [5, 1, 40, 12, 3] {
            list.push(donation(quantity, DonationStatus::Active));
            let stats = compute(&list);
            assert!(stats.meals_saved >= previous);
            previous = stats.meals_saved;
        }
    }

    #[test]
    fn impact_score_is_ten_per_donation_capped_at_89() {
        for (count, expected) in [(0usize, 0), (1, 10), (8, 80), (9, 89), (40, 89)] {
            let list: Vec<_> = (0..count)
                .map(|_| donation(1, DonationStatus::Active))
                .collect();
            assert_eq!(compute(&list).impact_score, expected, "count {}", count);
        }
    }

    #[test]
    fn active_count_only_counts_active_status() {
        let list = vec![
            donation(10, DonationStatus::Active),
            donation(10, DonationStatus::Active),
            donation(10, DonationStatus::Delivered),
            donation(10, DonationStatus::PickedUp),
        ];
        assert_eq!(compute(&list).active_donations, 2);
    }
}
