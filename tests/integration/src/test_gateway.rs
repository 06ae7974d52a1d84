//! Gateway scenarios: object round-trips, ranges, and listing pagination.

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use sledgate_api::ApiConfig;
    use sledgate_core::digest::md5_hex;

    use crate::{header, send, test_api, xml_text};

    #[test]
    fn test_should_round_trip_object_with_md5_etag() {
        let (api, _dir) = test_api(ApiConfig::default());

        // Bucket creation is idempotent.
        assert_eq!(send(&api, "PUT", "/b", &[], b"").status(), StatusCode::OK);
        assert_eq!(send(&api, "PUT", "/b", &[], b"").status(), StatusCode::OK);

        let put = send(&api, "PUT", "/b/hello", &[], b"ABCDEFGH");
        assert_eq!(put.status(), StatusCode::OK);
        assert_eq!(
            header(&put, "ETag"),
            Some("\"e8dc4081b13434b45189a720b77b6818\"")
        );

        let get = send(&api, "GET", "/b/hello", &[], b"");
        assert_eq!(get.status(), StatusCode::OK);
        assert_eq!(get.body().as_ref(), b"ABCDEFGH");
        assert_eq!(
            header(&get, "ETag"),
            Some("\"e8dc4081b13434b45189a720b77b6818\"")
        );
    }

    #[test]
    fn test_should_match_etag_for_varied_payloads() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/b", &[], b"");

        let payloads: [&[u8]; 4] = [b"", b"x", &[0u8, 1, 2, 254, 255], b"repeated-data-repeated"];
        for (i, payload) in payloads.iter().enumerate() {
            let uri = format!("/b/obj-{i}");
            let put = send(&api, "PUT", &uri, &[], payload);
            let expected = format!("\"{}\"", md5_hex(payload));
            assert_eq!(header(&put, "ETag"), Some(expected.as_str()));

            let get = send(&api, "GET", &uri, &[], b"");
            assert_eq!(get.body().as_ref(), *payload);
            assert_eq!(header(&get, "ETag"), Some(expected.as_str()));
        }
    }

    #[test]
    fn test_should_serve_every_valid_subrange() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/b", &[], b"");
        let data = b"ABCDEFGH";
        send(&api, "PUT", "/b/hello", &[], data);

        for start in 0..data.len() {
            for end in start..data.len() {
                let res = send(
                    &api,
                    "GET",
                    "/b/hello",
                    &[("Range", &format!("bytes={start}-{end}"))],
                    b"",
                );
                assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
                assert_eq!(res.body().as_ref(), &data[start..=end]);
                assert_eq!(
                    header(&res, "Content-Range"),
                    Some(format!("bytes {start}-{end}/8").as_str())
                );
            }
        }
    }

    #[test]
    fn test_should_answer_416_with_star_content_range() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/b", &[], b"");
        send(&api, "PUT", "/b/hello", &[], b"ABCDEFGH");

        for bad in ["bytes=100-200", "bytes=0-1,3-4", "bytes=5-2", "bytes=junk"] {
            let res = send(&api, "GET", "/b/hello", &[("Range", bad)], b"");
            assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE, "range {bad}");
            assert_eq!(header(&res, "Content-Range"), Some("bytes */8"));
        }
    }

    #[test]
    fn test_should_conflict_on_deleting_nonempty_bucket() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/b", &[], b"");
        send(&api, "PUT", "/b/k", &[], b"x");

        let res = send(&api, "DELETE", "/b", &[], b"");
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert_eq!(xml_text(&body, "Code").as_deref(), Some("BucketNotEmpty"));

        send(&api, "DELETE", "/b/k", &[], b"");
        assert_eq!(
            send(&api, "DELETE", "/b", &[], b"").status(),
            StatusCode::NO_CONTENT
        );
    }

    #[test]
    fn test_should_page_through_listing_without_revisits() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/b", &[], b"");

        let mut expected = Vec::new();
        for i in 0..23 {
            let key = format!("data/item-{i:03}");
            send(&api, "PUT", &format!("/b/{key}"), &[], b"x");
            expected.push(key);
        }
        // A non-matching neighbor must never appear under the prefix.
        send(&api, "PUT", "/b/other", &[], b"x");

        let mut seen = Vec::new();
        let mut token = String::new();
        loop {
            let uri = if token.is_empty() {
                "/b?prefix=data/&max-keys=5".to_owned()
            } else {
                format!("/b?prefix=data/&max-keys=5&continuation-token={token}")
            };
            let res = send(&api, "GET", &uri, &[], b"");
            assert_eq!(res.status(), StatusCode::OK);
            let body = String::from_utf8_lossy(res.body()).into_owned();

            let mut page: Vec<String> = body
                .split("<Key>")
                .skip(1)
                .filter_map(|rest| rest.split('<').next())
                .map(str::to_owned)
                .collect();
            assert!(page.len() <= 5);
            seen.append(&mut page);

            match xml_text(&body, "NextContinuationToken") {
                Some(next) => {
                    assert_eq!(xml_text(&body, "IsTruncated").as_deref(), Some("true"));
                    token = next;
                }
                None => {
                    assert_eq!(xml_text(&body, "IsTruncated").as_deref(), Some("false"));
                    break;
                }
            }
        }

        assert_eq!(seen, expected);
    }

    #[test]
    fn test_should_flip_truncation_when_second_key_appears() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/b", &[], b"");
        send(&api, "PUT", "/b/hello", &[], b"x");

        let res = send(&api, "GET", "/b?max-keys=1", &[], b"");
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert_eq!(xml_text(&body, "IsTruncated").as_deref(), Some("false"));
        assert!(xml_text(&body, "NextContinuationToken").is_none());

        send(&api, "PUT", "/b/world", &[], b"x");
        let res = send(&api, "GET", "/b?max-keys=1", &[], b"");
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert_eq!(xml_text(&body, "Key").as_deref(), Some("hello"));
        assert_eq!(xml_text(&body, "IsTruncated").as_deref(), Some("true"));

        let token = xml_text(&body, "NextContinuationToken").expect("token");
        let res = send(
            &api,
            "GET",
            &format!("/b?max-keys=1&continuation-token={token}"),
            &[],
            b"",
        );
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert_eq!(xml_text(&body, "Key").as_deref(), Some("world"));
        assert_eq!(xml_text(&body, "IsTruncated").as_deref(), Some("false"));
    }

    #[test]
    fn test_should_list_buckets_with_creation_dates() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/one", &[], b"");
        send(&api, "PUT", "/two", &[], b"");

        let res = send(&api, "GET", "/", &[], b"");
        assert_eq!(res.status(), StatusCode::OK);
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert!(body.contains("<Name>one</Name>"));
        assert!(body.contains("<Name>two</Name>"));
        // Synthesized timestamps still have the fixed millisecond-zero form.
        let date = xml_text(&body, "CreationDate").expect("creation date");
        assert!(date.ends_with(".000Z"), "unexpected date format: {date}");
    }

    #[test]
    fn test_should_survive_keys_with_slashes_and_spaces() {
        let (api, _dir) = test_api(ApiConfig::default());
        send(&api, "PUT", "/b", &[], b"");

        let put = send(&api, "PUT", "/b/dir%20a/file%20b.txt", &[], b"payload");
        assert_eq!(put.status(), StatusCode::OK);

        let get = send(&api, "GET", "/b/dir%20a/file%20b.txt", &[], b"");
        assert_eq!(get.status(), StatusCode::OK);
        assert_eq!(get.body().as_ref(), b"payload");

        let res = send(&api, "GET", "/b?prefix=dir%20a/", &[], b"");
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert!(body.contains("<Key>dir a/file b.txt</Key>"));
    }
}
