/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Envelope types shared by every provider response

use serde::{Deserialize, Deserializer, Serialize};

/// Standard response envelope: payload, pagination and usage metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
  /// Payload, absent on error responses
  pub data: Option<T>,

  /// Pagination info for listing endpoints
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub meta: Option<PageMeta>,

  /// Account usage counters reported by the provider
  #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
  pub usage: Option<UsageMetadata>,

  /// Error message when the provider rejects the request
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,

  /// Machine readable error code
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
}

impl<T> ApiResponse<T> {
  /// Provider error message, treating blank strings as no error
  pub fn error_message(&self) -> Option<&str> {
    self.error.as_deref().map(str::trim).filter(|e| !e.is_empty())
  }

  pub fn has_more(&self) -> bool {
    self.meta.as_ref().map(|m| m.has_more).unwrap_or(false)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
  #[serde(default)]
  pub total: Option<u64>,
  #[serde(default)]
  pub limit: Option<u64>,
  #[serde(default)]
  pub offset: Option<u64>,
  #[serde(default)]
  pub has_more: bool,
}

/// Usage counters. Negative or missing values mean "not reported".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
  #[serde(default)]
  pub api_requests_used: Option<i64>,
  #[serde(default)]
  pub api_requests_remaining: Option<i64>,
  #[serde(default)]
  pub api_daily_requests_used: Option<i64>,
  #[serde(default)]
  pub api_daily_requests_remaining: Option<i64>,
  #[serde(default)]
  pub api_rate_limit: Option<i64>,
  #[serde(default)]
  pub api_daily_limit: Option<i64>,
  #[serde(default)]
  pub api_request_limit: Option<i64>,
}

impl UsageMetadata {
  pub fn daily_remaining(&self) -> Option<u32> {
    self.api_daily_requests_remaining.and_then(|v| u32::try_from(v).ok())
  }

  /// Plan-wide remaining requests, which the provider counts per month
  pub fn monthly_remaining(&self) -> Option<u32> {
    self.api_requests_remaining.and_then(|v| u32::try_from(v).ok())
  }
}

/// Accept an identifier sent either as a JSON string or a JSON number
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Int(i64),
    Float(f64),
  }

  Ok(match Option::<Raw>::deserialize(deserializer)? {
    Some(Raw::Text(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
    Some(Raw::Int(n)) => Some(n.to_string()),
    Some(Raw::Float(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
    Some(Raw::Float(f)) => Some(f.to_string()),
    None => None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_envelope() {
    let json = r#"{"error": "Invalid API key", "code": "UNAUTHORIZED"}"#;
    let resp: ApiResponse<Vec<serde_json::Value>> = serde_json::from_str(json).unwrap();
    assert!(resp.data.is_none());
    assert_eq!(resp.error_message(), Some("Invalid API key"));
    assert_eq!(resp.code.as_deref(), Some("UNAUTHORIZED"));
  }

  #[test]
  fn test_missing_data_for_payload_without_default() {
    #[derive(Debug, Deserialize)]
    struct Listing {
      id: String,
    }

    let resp: ApiResponse<Listing> = serde_json::from_str(r#"{"error": "nope"}"#).unwrap();
    assert!(resp.data.is_none());

    let resp: ApiResponse<Listing> = serde_json::from_str(r#"{"data": {"id": "x"}}"#).unwrap();
    assert_eq!(resp.data.map(|l| l.id).as_deref(), Some("x"));
  }

  #[test]
  fn test_blank_error_is_not_an_error() {
    let json = r#"{"data": [], "error": "  "}"#;
    let resp: ApiResponse<Vec<serde_json::Value>> = serde_json::from_str(json).unwrap();
    assert_eq!(resp.error_message(), None);
    assert!(!resp.has_more());
  }

  #[test]
  fn test_usage_metadata() {
    let json = r#"{
      "data": [],
      "meta": {"total": 250, "limit": 100, "offset": 0, "hasMore": true},
      "_metadata": {"apiDailyRequestsRemaining": 87, "apiRequestsRemaining": -1}
    }"#;
    let resp: ApiResponse<Vec<serde_json::Value>> = serde_json::from_str(json).unwrap();
    assert!(resp.has_more());
    let usage = resp.usage.unwrap();
    assert_eq!(usage.daily_remaining(), Some(87));
    assert_eq!(usage.monthly_remaining(), None);
  }
}
