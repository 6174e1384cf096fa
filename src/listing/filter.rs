use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::str::FromStr;

use super::truck::{Truck, TruckStatus};

/// Availability choices offered by the filter form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Availability {
  Available,
  Scheduled,
}

impl Availability {
  /// Anything that is not available counts as scheduled.
  pub fn of(truck: &Truck) -> Self {
    match truck.status {
      TruckStatus::Available => Availability::Available,
      TruckStatus::Scheduled => Availability::Scheduled,
    }
  }
}

impl FromStr for Availability {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "available" => Ok(Availability::Available),
      "scheduled" => Ok(Availability::Scheduled),
      other => Err(format!("unknown availability '{}'", other)),
    }
  }
}

/// The user's current filter selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConstraints {
  /// Inclusive price range in rupees
  pub price: RangeInclusive<u32>,
  /// Minimum ratings; a truck passes if it meets any of them
  pub min_ratings: Vec<f32>,
  pub availability: BTreeSet<Availability>,
}

impl Default for FilterConstraints {
  fn default() -> Self {
    Self {
      price: 5000..=25000,
      min_ratings: Vec::new(),
      availability: BTreeSet::new(),
    }
  }
}

impl FilterConstraints {
  pub fn matches(&self, truck: &Truck) -> bool {
    if !self.price.contains(&truck.price) {
      return false;
    }

    // Rating filter (only if any threshold is checked)
    if !self.min_ratings.is_empty() && !self.min_ratings.iter().any(|min| truck.rating >= *min) {
      return false;
    }

    // Availability filter (only if any state is checked)
    if !self.availability.is_empty() && !self.availability.contains(&Availability::of(truck)) {
      return false;
    }

    true
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
  PriceLow,
  PriceHigh,
  Rating,
  Availability,
  /// Highest rated first
  #[default]
  Recommended,
}

impl SortMode {
  fn compare(&self, a: &Truck, b: &Truck) -> Ordering {
    match self {
      SortMode::PriceLow => a.price.cmp(&b.price),
      SortMode::PriceHigh => b.price.cmp(&a.price),
      SortMode::Rating | SortMode::Recommended => b.rating.total_cmp(&a.rating),
      SortMode::Availability => b.is_available().cmp(&a.is_available()),
    }
  }
}

impl FromStr for SortMode {
  type Err = std::convert::Infallible;

  /// Values of the sort dropdown. Unknown values fall back to `Recommended`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "price-low" => SortMode::PriceLow,
      "price-high" => SortMode::PriceHigh,
      "rating" => SortMode::Rating,
      "availability" => SortMode::Availability,
      _ => SortMode::Recommended,
    })
  }
}

/// Filter then stably sort the records to render.
pub fn filter_and_sort<'a>(
  trucks: &'a [Truck],
  constraints: &FilterConstraints,
  sort: SortMode,
) -> Vec<&'a Truck> {
  let mut result: Vec<&Truck> = trucks.iter().filter(|t| constraints.matches(t)).collect();
  result.sort_by(|a, b| sort.compare(a, b));
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  fn prices(trucks: &[&Truck]) -> Vec<u32> {
    trucks.iter().map(|t| t.price).collect()
  }

  fn ids<'a>(trucks: &[&'a Truck]) -> Vec<&'a str> {
    trucks.iter().map(|t| t.id.as_str()).collect()
  }

  #[test]
  fn test_price_high_sort() {
    let fleet = Truck::fleet();
    let sorted = filter_and_sort(&fleet, &FilterConstraints::default(), SortMode::PriceHigh);
    assert_eq!(prices(&sorted), vec![22000, 18000, 16000, 15000, 14000, 12500]);
  }

  #[test]
  fn test_price_low_sort() {
    let fleet = Truck::fleet();
    let sorted = filter_and_sort(&fleet, &FilterConstraints::default(), SortMode::PriceLow);
    assert_eq!(prices(&sorted), vec![12500, 14000, 15000, 16000, 18000, 22000]);
  }

  #[test]
  fn test_default_sort_is_by_rating() {
    let fleet = Truck::fleet();
    let sorted = filter_and_sort(&fleet, &FilterConstraints::default(), SortMode::default());
    assert_eq!(
      ids(&sorted),
      vec!["truck-004", "truck-003", "truck-001", "truck-006", "truck-002", "truck-005"]
    );
  }

  #[test]
  fn test_price_range_is_inclusive() {
    let fleet = Truck::fleet();
    let constraints = FilterConstraints {
      price: 14000..=16000,
      ..FilterConstraints::default()
    };
    let result = filter_and_sort(&fleet, &constraints, SortMode::PriceLow);
    assert_eq!(prices(&result), vec![14000, 15000, 16000]);
  }

  #[test]
  fn test_rating_thresholds_are_any_of() {
    let fleet = Truck::fleet();
    let constraints = FilterConstraints {
      min_ratings: vec![4.8, 4.6],
      ..FilterConstraints::default()
    };
    let result = filter_and_sort(&fleet, &constraints, SortMode::Rating);
    // Anything >= 4.6 passes the looser threshold
    assert_eq!(ids(&result), vec!["truck-004", "truck-003", "truck-001", "truck-006"]);
  }

  #[test]
  fn test_availability_filter_and_sort() {
    let mut fleet = Truck::fleet();
    fleet[0].status = TruckStatus::Scheduled;
    fleet[2].status = TruckStatus::Scheduled;

    let scheduled_only = FilterConstraints {
      availability: [Availability::Scheduled].into_iter().collect(),
      ..FilterConstraints::default()
    };
    let result = filter_and_sort(&fleet, &scheduled_only, SortMode::PriceLow);
    assert_eq!(ids(&result), vec!["truck-001", "truck-003"]);

    // Available first, otherwise original order
    let sorted = filter_and_sort(&fleet, &FilterConstraints::default(), SortMode::Availability);
    assert_eq!(
      ids(&sorted),
      vec!["truck-002", "truck-004", "truck-005", "truck-006", "truck-001", "truck-003"]
    );
  }

  #[test]
  fn test_result_is_subset_satisfying_predicate() {
    let fleet = Truck::fleet();
    let selections = [
      FilterConstraints::default(),
      FilterConstraints {
        price: 0..=13000,
        ..FilterConstraints::default()
      },
      FilterConstraints {
        price: 15000..=30000,
        min_ratings: vec![4.7],
        availability: [Availability::Available].into_iter().collect(),
      },
      FilterConstraints {
        price: 20000..=10000,
        ..FilterConstraints::default()
      },
    ];

    for constraints in &selections {
      for mode in [SortMode::PriceLow, SortMode::PriceHigh, SortMode::Availability] {
        let result = filter_and_sort(&fleet, constraints, mode);
        assert!(result.len() <= fleet.len());
        for truck in result {
          assert!(fleet.contains(truck));
          assert!(constraints.price.contains(&truck.price));
          assert!(constraints.matches(truck));
        }
      }
    }
  }

  #[test]
  fn test_parse_sort_and_availability() {
    assert_eq!("price-high".parse::<SortMode>().unwrap(), SortMode::PriceHigh);
    assert_eq!("bogus".parse::<SortMode>().unwrap(), SortMode::Recommended);
    assert_eq!("Available".parse::<Availability>().unwrap(), Availability::Available);
    assert!("maybe".parse::<Availability>().is_err());
  }
}
