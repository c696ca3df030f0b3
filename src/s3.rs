//! S3-compatible HTTP backend for the [`ObjectStore`] trait.
//!
//! Speaks the path-style REST dialect storage appliances expose: bucket
//! listing via `GET /{bucket}` with marker pagination, object download via
//! `GET /{bucket}/{key}` streamed straight to disk. Requests are signed with
//! the classic V2 scheme when credentials are present and sent anonymously
//! otherwise.

use crate::error::SyncError;
use crate::remote::{ListPage, ObjectStore};
use crate::sign::{authorization_header, http_date, Credentials};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{header, Client, StatusCode, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Keys requested per listing round-trip.
const PAGE_SIZE: &str = "1000";

/// Object-store backend for one appliance endpoint.
///
/// The inner client reuses connections across all calls; the store is
/// stateless beyond that and can be shared read-only between workers.
pub struct S3Store {
    client: Client,
    endpoint: Url,
    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    is_truncated: bool,
    next_marker: Option<String>,
    #[serde(default, rename = "Contents")]
    contents: Vec<ObjectSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectSummary {
    key: String,
    size: u64,
}

impl S3Store {
    /// Creates a store for `endpoint`, e.g. `https://192.0.2.10:8443`.
    pub fn new(endpoint: &str, credentials: Option<Credentials>) -> Result<Self, SyncError> {
        let endpoint =
            Url::parse(endpoint).map_err(|_| SyncError::Endpoint(endpoint.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(SyncError::Endpoint(endpoint.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            endpoint,
            credentials,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, SyncError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::Endpoint(self.endpoint.to_string()))?;
            segments.pop_if_empty().push(bucket);
            if !key.is_empty() {
                segments.extend(key.split('/'));
            }
        }
        Ok(url)
    }

    fn signed_get(&self, url: Url, resource: &str) -> reqwest::RequestBuilder {
        let date = http_date();
        let mut request = self.client.get(url).header(header::DATE, date.as_str());
        if let Some(credentials) = &self.credentials {
            request = request.header(
                header::AUTHORIZATION,
                authorization_header(credentials, "GET", &date, resource),
            );
        }
        request
    }
}

fn check_status(status: StatusCode, resource: &str) -> Result<(), SyncError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SyncError::Denied {
            resource: resource.to_string(),
        });
    }
    Err(SyncError::Status {
        status,
        resource: resource.to_string(),
    })
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        marker: Option<&str>,
    ) -> Result<ListPage, SyncError> {
        let mut url = self.object_url(bucket, "")?;
        url.query_pairs_mut().append_pair("max-keys", PAGE_SIZE);
        if let Some(marker) = marker {
            url.query_pairs_mut().append_pair("marker", marker);
        }

        let resource = format!("/{bucket}");
        let response = self.signed_get(url, &resource).send().await?;
        check_status(response.status(), &resource)?;

        let body = response.text().await?;
        let listing: ListBucketResult =
            quick_xml::de::from_str(&body).map_err(|e| SyncError::Listing {
                bucket: bucket.to_string(),
                reason: format!("malformed listing response: {e}"),
            })?;
        debug!(
            "listed {} keys from '{}', truncated={}",
            listing.contents.len(),
            bucket,
            listing.is_truncated
        );

        // Marker-style pagination: the remote only sends NextMarker when a
        // delimiter is in play, so fall back to the last key of the page.
        let next_marker = if listing.is_truncated {
            listing
                .next_marker
                .or_else(|| listing.contents.last().map(|object| object.key.clone()))
        } else {
            None
        };
        let entries = listing
            .contents
            .into_iter()
            .map(|object| (object.key, object.size))
            .collect();

        Ok(ListPage {
            entries,
            next_marker,
        })
    }

    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), SyncError> {
        let url = self.object_url(bucket, key)?;
        let resource = format!("/{bucket}/{key}");
        let response = self.signed_get(url, &resource).send().await?;
        check_status(response.status(), &resource)?;

        // Stream into a `.part` sibling and rename once complete, so an
        // interrupted transfer never leaves a final-named partial file.
        let partial = partial_path(dest);
        match write_stream(response, &partial).await {
            Ok(()) => {
                tokio::fs::rename(&partial, dest).await?;
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_stream(response: reqwest::Response, path: &Path) -> Result<(), SyncError> {
    let mut file = BufWriter::new(tokio::fs::File::create(path).await?);
    let mut byte_stream = response.bytes_stream();
    while let Some(piece) = byte_stream.next().await {
        file.write_all(&piece?).await?;
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>shipment-42</Name>
  <Prefix></Prefix>
  <Marker></Marker>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <Contents>
    <Key>data/part-0001.bin</Key>
    <LastModified>2024-11-02T09:14:33.000Z</LastModified>
    <ETag>&quot;0123456789abcdef0123456789abcdef&quot;</ETag>
    <Size>1048576</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>data/part-0002.bin</Key>
    <Size>524288</Size>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn parses_a_listing_page() {
        let listing: ListBucketResult = quick_xml::de::from_str(LISTING).unwrap();
        assert!(listing.is_truncated);
        assert_eq!(listing.next_marker, None);
        assert_eq!(listing.contents.len(), 2);
        assert_eq!(listing.contents[0].key, "data/part-0001.bin");
        assert_eq!(listing.contents[0].size, 1_048_576);
        assert_eq!(listing.contents[1].size, 524_288);
    }

    #[test]
    fn parses_an_empty_listing() {
        let body = r#"<ListBucketResult><IsTruncated>false</IsTruncated></ListBucketResult>"#;
        let listing: ListBucketResult = quick_xml::de::from_str(body).unwrap();
        assert!(!listing.is_truncated);
        assert!(listing.contents.is_empty());
    }

    #[test]
    fn object_urls_are_path_style() {
        let store = S3Store::new("https://appliance.local:8443", None).unwrap();
        let url = store.object_url("shipment-42", "data/part-0001.bin").unwrap();
        assert_eq!(
            url.as_str(),
            "https://appliance.local:8443/shipment-42/data/part-0001.bin"
        );
    }

    #[test]
    fn keys_with_spaces_are_encoded() {
        let store = S3Store::new("https://appliance.local", None).unwrap();
        let url = store.object_url("bucket", "dir/file name.bin").unwrap();
        assert_eq!(
            url.as_str(),
            "https://appliance.local/bucket/dir/file%20name.bin"
        );
    }

    #[test]
    fn rejects_a_malformed_endpoint() {
        assert!(matches!(
            S3Store::new("not a url", None),
            Err(SyncError::Endpoint(_))
        ));
    }

    #[test]
    fn partial_path_appends_suffix() {
        let partial = partial_path(Path::new("/dest/data/part-0001.bin"));
        assert_eq!(partial, Path::new("/dest/data/part-0001.bin.part"));
    }
}
