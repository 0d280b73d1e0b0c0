//! Testing utilities for the flowlens workspace
//!
//! Fixture builders for Taiga payloads and a synthetic backend that serves
//! them over HTTP.

#![allow(missing_docs)]

pub mod backend;
pub mod fixtures;

pub use backend::{MockTaiga, MockTaigaBuilder, PagingStyle, RecordedRequest, TEST_TOKEN};
pub use fixtures::{milestone, project, record, records, status_change, RecordBuilder};

/// Pages of `records`, `page_size` per page
pub fn paged(records: Vec<serde_json::Value>, page_size: usize) -> Vec<Vec<serde_json::Value>> {
    records
        .chunks(page_size.max(1))
        .map(<[serde_json::Value]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paged_splits_evenly_and_keeps_remainder() {
        let pages = paged(records(1, 5), 2);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].len(), 1);
        assert_eq!(pages[2][0]["id"], 5);
    }

    #[test]
    fn record_builder_sets_fields() {
        let r = record(7).status(2, "In progress").assigned("Ana").blocked().build();
        assert_eq!(r["status_extra_info"]["name"], "In progress");
        assert_eq!(r["assigned_to_extra_info"]["full_name_display"], "Ana");
        assert_eq!(r["is_blocked"], true);
    }

    #[tokio::test]
    async fn backend_requires_token_for_collections() {
        let backend = MockTaiga::builder().start().await;
        let addr = backend.addr();
        let status = tokio::task::spawn_blocking(move || {
            use std::io::{Read, Write};
            let mut stream = std::net::TcpStream::connect(addr).unwrap();
            write!(
                stream,
                "GET /api/v1/userstories?project=1&page=1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
            )
            .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        })
        .await
        .unwrap();
        assert!(status.starts_with("HTTP/1.1 401"));
        assert_eq!(backend.request_count("/api/v1/userstories"), 1);
    }
}
