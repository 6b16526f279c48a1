// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Telegram parsing for appliance status messages.
//!
//! The appliance reports its state as one flat line of short key/value pairs:
//!
//! ```text
//! pe=87,kn=2240,w1=120,w2=0,d1=1,e1=8:0,f1=22:00,h1=300,c1=9
//! ```
//!
//! A [`Telegram`] keeps the pairs in order; the field registry decides what
//! each key means.
//!
//! # Examples
//!
//! ```
//! use hame_bridge::telemetry::Telegram;
//!
//! let telegram: Telegram = "pe=87,e1=8:0".parse().unwrap();
//! assert_eq!(telegram.get("pe"), Some("87"));
//! assert_eq!(telegram.len(), 2);
//! ```

pub mod transform;

use std::convert::Infallible;
use std::str::FromStr;

/// One inbound key/value protocol message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Telegram {
    pairs: Vec<(String, String)>,
}

impl Telegram {
    /// Splits a `k=v,k=v` payload.
    ///
    /// Pairs without `=` or with an empty key are skipped. Keys and values
    /// are trimmed.
    #[must_use]
    pub fn parse(payload: &str) -> Self {
        let pairs = payload
            .split(',')
            .filter(|pair| !pair.trim().is_empty())
            .filter_map(|pair| match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    Some((key.trim().to_string(), value.trim().to_string()))
                }
                _ => {
                    tracing::debug!(pair = %pair, "Skipping malformed telegram pair");
                    None
                }
            })
            .collect();
        Self { pairs }
    }

    /// Builds a telegram from already split pairs.
    #[must_use]
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the raw value of a key.
    ///
    /// If a key repeats, the last occurrence wins, matching the order in
    /// which a decoded telegram is applied.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the pairs in telegram order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the telegram carried no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromStr for Telegram {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
