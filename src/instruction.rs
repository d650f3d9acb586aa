//! The payment instruction shown to payers.
//!
//! A checkout is presented as a `paytill:` link that a wallet can open,
//! usually delivered as a QR code on the till's display:
//!
//! ```text
//! paytill:<recipient>?amount=<decimal>&reference=<base58>[&memo=..][&label=..][&message=..]
//! ```
//!
//! `memo`, `label`, and `message` values are percent-encoded. Parsing
//! accepts links with the parameters in any order and ignores keys it
//! does not know, so older tills can read links from newer ones.

use crate::address::Address;
use crate::error::{Error, Result};
use crate::request::{PaymentRequest, Reference};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, PercentEncode, CONTROLS};
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use rust_decimal::Decimal;
use std::fmt;

/// Most decimal places the ledger's native token can represent.
const NATIVE_SCALE: u32 = 9;

/// Characters escaped in query values, beyond controls: everything that
/// would be read as link structure, plus '%' itself.
const QUERY_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'=');

fn escape(value: &str) -> PercentEncode<'_> {
    utf8_percent_encode(value, QUERY_ESCAPE)
}

fn check_scale(amount: Decimal) -> Result<Decimal> {
    if amount.scale() > NATIVE_SCALE {
        return Err(Error::Encoding(format!(
            "amount {amount} has more than {NATIVE_SCALE} decimal places"
        )));
    }
    Ok(amount)
}

fn unescape(value: &str) -> Result<String> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::Encoding(format!("invalid percent-encoding: {e}")))
}

/// A parsed or rendered `paytill:` payment link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUri {
    /// Account the payment goes to.
    pub recipient: Address,
    /// Amount due.
    pub amount: Decimal,
    /// Checkout reference the wallet must attach.
    pub reference: Reference,
    /// Order memo the payment should carry.
    pub memo: Option<String>,
    /// Merchant name for the wallet to display.
    pub label: Option<String>,
    /// Free-form note for the wallet to display.
    pub message: Option<String>,
}

impl PaymentUri {
    /// Render a payment request as a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount has more decimal places than the
    /// ledger's native token can represent.
    pub fn encode(request: &PaymentRequest) -> Result<Self> {
        Ok(Self {
            recipient: request.recipient,
            amount: check_scale(request.amount)?,
            reference: request.reference,
            memo: request.memo.clone(),
            label: None,
            message: None,
        })
    }

    /// Attach a merchant name for the payer's wallet to display.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a free-form note for the payer's wallet to display.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Parse a `paytill:` link.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheme is wrong, the recipient or
    /// reference does not decode, the amount is not a decimal the
    /// ledger's native token can represent, a query parameter is
    /// malformed, or `amount`/`reference` are missing.
    pub fn parse(input: &str) -> Result<Self> {
        let rest = input.strip_prefix("paytill:").ok_or_else(|| {
            Error::Encoding("payment link must start with \"paytill:\"".to_string())
        })?;
        let (recipient_part, query) = match rest.split_once('?') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        let recipient = Address::from_base58(recipient_part)
            .map_err(|e| Error::Encoding(format!("bad recipient in payment link: {e}")))?;

        let mut amount = None;
        let mut reference = None;
        let mut memo = None;
        let mut label = None;
        let mut message = None;
        for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::Encoding(format!("malformed query parameter: {pair}")));
            };
            match key {
                "amount" => {
                    let parsed = value.parse::<Decimal>().map_err(|e| {
                        Error::Encoding(format!("bad amount in payment link: {e}"))
                    })?;
                    amount = Some(check_scale(parsed)?);
                }
                "reference" => reference = Some(Reference::from_base58(value)?),
                "memo" => memo = Some(unescape(value)?),
                "label" => label = Some(unescape(value)?),
                "message" => message = Some(unescape(value)?),
                _ => {}
            }
        }

        let amount =
            amount.ok_or_else(|| Error::Encoding("payment link missing amount".to_string()))?;
        let reference = reference
            .ok_or_else(|| Error::Encoding("payment link missing reference".to_string()))?;
        Ok(Self {
            recipient,
            amount,
            reference,
            memo,
            label,
            message,
        })
    }

    /// Render the link as a QR code drawn with block characters,
    /// inverted so it scans on dark terminal themes.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is too long to fit a QR code.
    pub fn qr_unicode(&self) -> Result<String> {
        let code = QrCode::new(self.to_string().as_bytes())
            .map_err(|e| Error::Encoding(format!("payment code: {e}")))?;
        Ok(code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build())
    }

    /// Render the link as an SVG QR code for customer-facing displays.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is too long to fit a QR code.
    pub fn qr_svg(&self) -> Result<String> {
        let code = QrCode::new(self.to_string().as_bytes())
            .map_err(|e| Error::Encoding(format!("payment code: {e}")))?;
        Ok(code
            .render()
            .min_dimensions(256, 256)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build())
    }
}

impl fmt::Display for PaymentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "paytill:{}?amount={}&reference={}",
            self.recipient, self.amount, self.reference
        )?;
        if let Some(memo) = &self.memo {
            write!(f, "&memo={}", escape(memo))?;
        }
        if let Some(label) = &self.label {
            write!(f, "&label={}", escape(label))?;
        }
        if let Some(message) = &self.message {
            write!(f, "&message={}", escape(message))?;
        }
        Ok(())
    }
}
