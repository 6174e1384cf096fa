//! Checkout totals, booking ids and payment form normalization.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Totals shown on the checkout page, in rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkout {
  pub base_total: u32,
  pub insurance_cost: u32,
  pub insured: bool,
}

impl Default for Checkout {
  fn default() -> Self {
    Self {
      base_total: 12500,
      insurance_cost: 500,
      insured: false,
    }
  }
}

impl Checkout {
  pub fn new(base_total: u32) -> Self {
    Self {
      base_total,
      ..Self::default()
    }
  }

  pub fn toggle_insurance(&mut self, insured: bool) {
    self.insured = insured;
  }

  pub fn total(&self) -> u32 {
    if self.insured {
      self.base_total.saturating_add(self.insurance_cost)
    } else {
      self.base_total
    }
  }

  /// Label of the pay button, e.g. "Pay ₹13,000".
  pub fn pay_label(&self) -> String {
    format!("Pay {}", format_inr(self.total()))
  }
}

/// Rupee amount with Indian digit grouping: ₹12,500 and ₹1,25,000.
pub fn format_inr(amount: u32) -> String {
  let digits = amount.to_string();
  if digits.len() <= 3 {
    return format!("₹{}", digits);
  }

  let (head, last3) = digits.split_at(digits.len() - 3);
  let mut groups: Vec<&str> = Vec::new();
  let mut rest = head;
  while rest.len() > 2 {
    let (front, pair) = rest.split_at(rest.len() - 2);
    groups.push(pair);
    rest = front;
  }
  groups.push(rest);
  groups.reverse();

  format!("₹{},{}", groups.join(","), last3)
}

/// "FF" + last 8 digits of the epoch millis + 3 digits from the sub-millisecond clock.
pub fn generate_booking_id(now: DateTime<Utc>) -> String {
  let millis = now.timestamp_millis().unsigned_abs() % 100_000_000;
  let jitter = (now.timestamp_subsec_nanos() % 1_000_000) / 1000;
  format!("FF{:08}{:03}", millis, jitter)
}

/// Group typed card digits in fours: "4111111111111111" -> "4111 1111 1111 1111".
pub fn format_card_number(input: &str) -> String {
  let compact: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
  compact
    .chunks(4)
    .map(|chunk| chunk.iter().collect::<String>())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Normalize typed expiry digits: "1227" -> "12/27".
pub fn format_card_expiry(input: &str) -> String {
  let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
  if digits.len() >= 2 {
    let year: String = digits.chars().skip(2).take(2).collect();
    format!("{}/{}", &digits[..2], year)
  } else {
    digits
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentMethod {
  #[default]
  Upi,
  Card,
  NetBanking,
  Wallet,
}

impl FromStr for PaymentMethod {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "upi" => Ok(PaymentMethod::Upi),
      "card" => Ok(PaymentMethod::Card),
      "netbanking" => Ok(PaymentMethod::NetBanking),
      "wallet" => Ok(PaymentMethod::Wallet),
      other => Err(format!("unknown payment method '{}'", other)),
    }
  }
}

/// What the user entered on the payment form.
#[derive(Debug, Clone, Default)]
pub struct PaymentForm {
  pub method: PaymentMethod,
  pub terms_accepted: bool,
  /// Paying by UPI id rather than QR/app
  pub upi_by_id: bool,
  pub upi_id: String,
  pub card_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
  TermsNotAccepted,
  MissingUpiId,
  MissingCardDetails,
}

impl fmt::Display for PaymentError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PaymentError::TermsNotAccepted => write!(f, "Please accept the Terms & Conditions"),
      PaymentError::MissingUpiId => write!(f, "Please enter your UPI ID"),
      PaymentError::MissingCardDetails => write!(f, "Please enter card details"),
    }
  }
}

impl std::error::Error for PaymentError {}

impl PaymentForm {
  pub fn validate(&self) -> Result<(), PaymentError> {
    if !self.terms_accepted {
      return Err(PaymentError::TermsNotAccepted);
    }

    match self.method {
      PaymentMethod::Upi if self.upi_by_id && self.upi_id.trim().is_empty() => {
        Err(PaymentError::MissingUpiId)
      }
      PaymentMethod::Card if self.card_number.trim().is_empty() => {
        Err(PaymentError::MissingCardDetails)
      }
      _ => Ok(()),
    }
  }
}
