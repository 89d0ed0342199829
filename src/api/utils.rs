//! Request checks shared by the JSON endpoints

use crate::api::error::ApiError;

/// Accepts `application/json` with optional parameters, nothing else
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(data.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_content_types() {
        for accepted in ["application/json", "application/json; charset=utf-8"] {
            assert!(parse_content_type(accepted).is_ok(), "{accepted}");
        }
        for rejected in ["application/jsonp", "text/json", "text/plain", "invalid", ""] {
            assert!(parse_content_type(rejected).is_err(), "{rejected}");
        }
    }

    #[test]
    fn test_body_size_limit_is_inclusive() {
        let body = br#"{"target_language":"es","text":"hi","task_id":1}"#;
        assert!(validate_body_size(body, body.len()).is_ok());

        match validate_body_size(body, body.len() - 1) {
            Err(ApiError::PayloadTooLarge(size)) => assert_eq!(size, body.len()),
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }
}
