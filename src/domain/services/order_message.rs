//! Order message composition
//!
//! Turns a cart snapshot and the customer's contact fields into the order
//! transcript sent to the merchant, and the messaging deep link carrying it.
//! Composition is pure: identical input gives byte-identical output.
//! [`CheckoutProfile`] remembers the customer's fields in client storage.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use validator::{Validate, ValidationErrors};
use crate::domain::aggregates::cart::{validate_lines, CartError, CartLine, MerchantKind};
use crate::domain::value_objects::{ContactNumber, ContactNumberError, CurrencyFormat, Money};
use crate::storage::{ClientStorage, CUSTOMER_PROFILE_KEY};

/// Characters left unescaped by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const DEFAULT_MESSAGING_HOST: &str = "wa.me";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CustomerDetails {
    #[validate(length(max = 120))]
    #[serde(default)]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
}

impl CustomerDetails {
    pub fn new(name: Option<&str>, address: impl Into<String>) -> Self {
        Self { name: name.map(str::to_string), address: address.into() }
    }

    pub fn with_address(name: Option<&str>, address: &DeliveryAddress) -> Self { Self::new(name, address.to_string()) }
}

/// Structured delivery address, rendered to the single address line of the transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryAddress {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl fmt::Display for DeliveryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        write!(f, "{}, {}", self.street.trim(), self.number.trim())?;
        if let Some(complement) = present(&self.complement) { write!(f, " - {complement}")?; }
        match (present(&self.district), present(&self.city)) {
            (Some(district), Some(city)) => write!(f, " - {district}, {city}")?,
            (Some(only), None) | (None, Some(only)) => write!(f, " - {only}")?,
            (None, None) => {}
        }
        if let Some(postal_code) = present(&self.postal_code) { write!(f, " - CEP: {postal_code}")?; }
        Ok(())
    }
}

/// Customer fields remembered between orders so the checkout form comes back filled in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutProfile {
    pub name: Option<String>,
    pub address: DeliveryAddress,
}

impl CheckoutProfile {
    /// Stored profile, or a blank one when nothing usable is stored.
    pub fn load(storage: &dyn ClientStorage) -> Self {
        match storage.load(CUSTOMER_PROFILE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored checkout profile is not readable");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "checkout profile storage unavailable");
                Self::default()
            }
        }
    }

    /// Best effort; a failed write only means the form starts empty next time.
    pub fn remember(&self, storage: &dyn ClientStorage) {
        let result = serde_json::to_string(self)
            .map_err(|e| e.to_string())
            .and_then(|raw| storage.save(CUSTOMER_PROFILE_KEY, &raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist checkout profile");
        }
    }

    pub fn customer(&self) -> CustomerDetails { CustomerDetails::with_address(self.name.as_deref(), &self.address) }
}

/// Collapse line breaks so free text cannot add lines to the transcript.
fn single_line(value: &str) -> String {
    value.split(['\r', '\n']).map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    pub quantity: u32,
    pub title: String,
    pub variant_labels: Vec<String>,
    pub note: Option<String>,
}

/// Derived order record; never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTranscript {
    pub merchant_name: String,
    pub kind: MerchantKind,
    pub customer_name: Option<String>,
    pub delivery_address: String,
    pub lines: Vec<TranscriptLine>,
    pub total: Money,
}

impl OrderTranscript {
    pub fn render(&self, currency: &CurrencyFormat) -> String {
        let (heading, section) = if self.kind.takes_appointments() {
            ("New Appointment Request", "Services")
        } else {
            ("New Order", "Items")
        };

        let mut text = format!("*{heading} for {}*\n\n", self.merchant_name);
        if let Some(name) = &self.customer_name {
            text.push_str(&format!("Customer: {name}\n"));
        }
        text.push_str(&format!("Address: {}\n\n", self.delivery_address));
        text.push_str(&format!("*{section}:*\n"));
        for line in &self.lines {
            text.push_str(&format!("{}x {}", line.quantity, line.title));
            if !line.variant_labels.is_empty() {
                text.push_str(&format!(" ({})", line.variant_labels.join(", ")));
            }
            text.push('\n');
            if let Some(note) = &line.note {
                text.push_str(&format!("  Note: {note}\n"));
            }
        }
        text.push_str(&format!("\n*Total: {}*", currency.format(self.total)));
        text
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMessage {
    pub text: String,
    pub uri: String,
}

#[derive(Clone, Debug)]
pub struct OrderComposer {
    currency: CurrencyFormat,
    messaging_host: String,
}

impl Default for OrderComposer {
    fn default() -> Self { Self::new(CurrencyFormat::default(), DEFAULT_MESSAGING_HOST) }
}

impl OrderComposer {
    pub fn new(currency: CurrencyFormat, messaging_host: impl Into<String>) -> Self {
        Self { currency, messaging_host: messaging_host.into() }
    }

    pub fn transcript(&self, lines: &[CartLine], customer: &CustomerDetails) -> Result<OrderTranscript, ComposeError> {
        let first = lines.first().ok_or(ComposeError::EmptyCart)?;
        validate_lines(lines)?;
        customer.validate()?;
        let delivery_address = single_line(&customer.address);
        if delivery_address.is_empty() {
            return Err(ComposeError::MissingAddress);
        }

        Ok(OrderTranscript {
            merchant_name: single_line(first.merchant_name()),
            kind: first.merchant_kind(),
            customer_name: customer.name.as_deref().map(single_line).filter(|n| !n.is_empty()),
            delivery_address,
            lines: lines.iter().map(|l| TranscriptLine {
                quantity: l.quantity(),
                title: single_line(l.title()),
                variant_labels: l.variant_labels().iter().map(|v| single_line(v)).collect(),
                note: l.note().map(single_line).filter(|n| !n.is_empty()),
            }).collect(),
            total: lines.iter().map(CartLine::line_total).sum(),
        })
    }

    pub fn compose(&self, lines: &[CartLine], customer: &CustomerDetails) -> Result<OrderMessage, ComposeError> {
        let transcript = self.transcript(lines, customer)?;
        let contact = ContactNumber::new(lines[0].merchant_contact())?;
        let text = transcript.render(&self.currency);
        let uri = format!("https://{}/{}?text={}", self.messaging_host, contact, utf8_percent_encode(&text, URI_COMPONENT));
        Ok(OrderMessage { text, uri })
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("delivery address is required")]
    MissingAddress,
    #[error("invalid customer details: {0}")]
    InvalidCustomer(#[from] ValidationErrors),
    #[error("invalid cart: {0}")]
    InvalidCart(#[from] CartError),
    #[error("merchant contact: {0}")]
    Contact(#[from] ContactNumberError),
}
