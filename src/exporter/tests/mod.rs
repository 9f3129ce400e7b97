use super::test_helpers::*;
use super::*;
use crate::types::{Event, ExportStatus};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
