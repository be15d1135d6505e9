//! S3-style key coordinates: `region/bucket/file`.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::ParseError;

/// Location of an authorized_keys object in S3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub region: String,
    pub bucket: String,
    /// Object key; may itself contain `/`.
    pub file: String,
}

impl S3Location {
    /// Public HTTPS URL of the object (virtual-hosted style).
    #[must_use]
    pub fn https_url(&self) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, self.file
        )
    }
}

impl FromStr for S3Location {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseError::S3Path {
            input: input.to_string(),
            reason,
        };
        let trimmed = input.trim().trim_start_matches("s3://");
        let mut parts = trimmed.splitn(3, '/');
        let region = parts.next().filter(|p| !p.is_empty()).ok_or_else(|| err("missing region"))?;
        let bucket = parts.next().filter(|p| !p.is_empty()).ok_or_else(|| err("missing bucket"))?;
        let file = parts.next().filter(|p| !p.is_empty()).ok_or_else(|| err("missing file"))?;
        if region.contains(char::is_whitespace) || bucket.contains(char::is_whitespace) {
            return Err(err("region and bucket cannot contain whitespace"));
        }
        Ok(Self {
            region: region.to_string(),
            bucket: bucket.to_string(),
            file: file.to_string(),
        })
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.bucket, self.file)
    }
}
