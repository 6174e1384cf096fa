use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruckStatus {
  Available,
  Scheduled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub capacity: String,
  pub location: String,
  pub transporter: String,
  pub rating: f32,
  pub trips: u32,
  pub experience: String,
  /// Rupees
  pub price: u32,
  pub status: TruckStatus,
}

impl Truck {
  #[allow(clippy::too_many_arguments)]
  fn listed(
    id: &str,
    name: &str,
    kind: &str,
    capacity: &str,
    location: &str,
    transporter: &str,
    rating: f32,
    trips: u32,
    experience: &str,
    price: u32,
  ) -> Self {
    Self {
      id: id.to_string(),
      name: name.to_string(),
      kind: kind.to_string(),
      capacity: capacity.to_string(),
      location: location.to_string(),
      transporter: transporter.to_string(),
      rating,
      trips,
      experience: experience.to_string(),
      price,
      status: TruckStatus::Available,
    }
  }

  /// The trucks shown on the booking page.
  pub fn fleet() -> Vec<Truck> {
    vec![
      Truck::listed("truck-001", "Tata 407", "Open Body", "9 Tons", "Mumbai", "Rajesh Transport Co.", 4.7, 234, "3 years", 12500),
      Truck::listed("truck-002", "Eicher Pro 3015", "Container", "16 Tons", "Bangalore", "Sharma Logistics", 4.5, 189, "2 years", 15000),
      Truck::listed("truck-003", "Ashok Leyland 2518", "Trailer", "20 Tons", "Hyderabad", "Tech Transport Ltd", 4.8, 267, "4 years", 18000),
      Truck::listed("truck-004", "BharatBenz 1617", "Tanker", "18 Tons (Liquid)", "Delhi", "Premium Transport Inc", 4.9, 312, "5 years", 22000),
      Truck::listed("truck-005", "Mahindra Furio 14", "Open Body", "12 Tons", "Ahmedabad", "Gujarat Freight Co.", 4.4, 156, "2.5 years", 14000),
      Truck::listed("truck-006", "Tata LPT 1613", "Container", "14 Tons", "Pune", "Express Logistics", 4.6, 201, "3.5 years", 16000),
    ]
  }

  pub fn is_available(&self) -> bool {
    self.status == TruckStatus::Available
  }

  /// Summary carried from the listing to the details page.
  pub fn selection(&self) -> SelectedTruck {
    SelectedTruck {
      id: self.id.clone(),
      name: self.name.clone(),
      rating: self.rating,
      price: self.price,
      kind: self.kind.clone(),
      capacity: self.capacity.clone(),
      transporter: self.transporter.clone(),
      location: self.location.clone(),
      status: self.status,
    }
  }
}

/// The record a listing click hands to the details page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTruck {
  pub id: String,
  pub name: String,
  pub rating: f32,
  pub price: u32,
  #[serde(rename = "type")]
  pub kind: String,
  pub capacity: String,
  pub transporter: String,
  pub location: String,
  pub status: TruckStatus,
}
