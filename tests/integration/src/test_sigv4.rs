//! SigV4 round-trip against the full API: requests signed with the
//! configured key material are accepted, tampered ones are not.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;
    use sha2::{Digest, Sha256};

    use sledgate_api::{Api, ApiConfig};
    use sledgate_auth::sigv4::{build_string_to_sign, compute_signature, derive_signing_key};
    use sledgate_auth::{AuthMode, Credentials};
    use sledgate_core::digest::sha256_hex;

    use crate::{test_api, xml_text};

    const ACCESS_KEY: &str = "AKIDEXAMPLE";
    const SECRET_KEY: &str = "testing-secret";
    const AMZ_DATE: &str = "20240101T000000Z";
    const SCOPE_DATE: &str = "20240101";
    const REGION: &str = "us-east-1";
    const HOST: &str = "localhost:9000";

    fn sigv4_api() -> (Api, tempfile::TempDir) {
        test_api(ApiConfig {
            auth_mode: AuthMode::SigV4,
            credentials: Credentials {
                access_key: ACCESS_KEY.to_owned(),
                secret_key: SECRET_KEY.to_owned(),
            },
            ..ApiConfig::default()
        })
    }

    /// Sign a request the way an SDK would and return its Authorization
    /// header value.
    fn sign(method: &str, path: &str, payload_hash: &str) -> String {
        let canonical_request = format!(
            "{method}\n{path}\n\n\
             host:{HOST}\n\
             x-amz-content-sha256:{payload_hash}\n\
             x-amz-date:{AMZ_DATE}\n\n\
             host;x-amz-content-sha256;x-amz-date\n\
             {payload_hash}"
        );
        let scope = format!("{SCOPE_DATE}/{REGION}/s3/aws4_request");
        let string_to_sign = build_string_to_sign(
            AMZ_DATE,
            &scope,
            &hex::encode(Sha256::digest(canonical_request.as_bytes())),
        );
        let key = derive_signing_key(SECRET_KEY, SCOPE_DATE, REGION, "s3");
        let signature = compute_signature(&key, &string_to_sign);

        format!(
            "AWS4-HMAC-SHA256 Credential={ACCESS_KEY}/{scope}, \
             SignedHeaders=host;x-amz-content-sha256;x-amz-date, \
             Signature={signature}"
        )
    }

    fn signed_request(
        api: &Api,
        method: &str,
        path: &str,
        body: &[u8],
        mangle: impl FnOnce(String) -> String,
    ) -> http::Response<Bytes> {
        let payload_hash = sha256_hex(body);
        let authorization = mangle(sign(method, path, &payload_hash));

        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(path)
            .header("Host", HOST)
            .header("x-amz-date", AMZ_DATE)
            .header("x-amz-content-sha256", &payload_hash)
            .header(http::header::AUTHORIZATION, authorization)
            .body(())
            .expect("request")
            .into_parts();
        api.handle(&parts, &Bytes::copy_from_slice(body))
    }

    #[test]
    fn test_should_accept_correctly_signed_requests() {
        let (api, _dir) = sigv4_api();

        let res = signed_request(&api, "PUT", "/b", b"", |auth| auth);
        assert_eq!(res.status(), StatusCode::OK);

        let res = signed_request(&api, "PUT", "/b/hello", b"ABCDEFGH", |auth| auth);
        assert_eq!(res.status(), StatusCode::OK);

        let res = signed_request(&api, "GET", "/b/hello", b"", |auth| auth);
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body().as_ref(), b"ABCDEFGH");
    }

    #[test]
    fn test_should_reject_signature_with_one_flipped_nibble() {
        let (api, _dir) = sigv4_api();
        signed_request(&api, "PUT", "/b", b"", |auth| auth);

        let res = signed_request(&api, "PUT", "/b/hello", b"ABCDEFGH", |auth| {
            let mut chars: Vec<char> = auth.chars().collect();
            let last = chars.len() - 1;
            chars[last] = if chars[last] == '0' { '1' } else { '0' };
            chars.into_iter().collect()
        });
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert_eq!(
            xml_text(&body, "Code").as_deref(),
            Some("SignatureDoesNotMatch")
        );
    }

    #[test]
    fn test_should_reject_request_signed_for_other_method() {
        let (api, _dir) = sigv4_api();
        signed_request(&api, "PUT", "/b", b"", |auth| auth);
        signed_request(&api, "PUT", "/b/hello", b"ABCDEFGH", |auth| auth);

        // A DELETE carrying a signature computed for GET must not verify.
        let payload_hash = sha256_hex(b"");
        let authorization = sign("GET", "/b/hello", &payload_hash);
        let (parts, ()) = http::Request::builder()
            .method("DELETE")
            .uri("/b/hello")
            .header("Host", HOST)
            .header("x-amz-date", AMZ_DATE)
            .header("x-amz-content-sha256", &payload_hash)
            .header(http::header::AUTHORIZATION, authorization)
            .body(())
            .expect("request")
            .into_parts();
        let res = api.handle(&parts, &Bytes::new());
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_should_deny_unsigned_requests() {
        let (api, _dir) = sigv4_api();
        let (parts, ()) = http::Request::builder()
            .method("GET")
            .uri("/")
            .header("Host", HOST)
            .body(())
            .expect("request")
            .into_parts();
        let res = api.handle(&parts, &Bytes::new());
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert_eq!(xml_text(&body, "Code").as_deref(), Some("AccessDenied"));
    }

    #[test]
    fn test_should_answer_501_for_streaming_payloads() {
        let (api, _dir) = sigv4_api();
        let (parts, ()) = http::Request::builder()
            .method("PUT")
            .uri("/b/k")
            .header("Host", HOST)
            .header("x-amz-date", AMZ_DATE)
            .header("x-amz-content-sha256", "STREAMING-AWS4-HMAC-SHA256-PAYLOAD")
            .header(
                http::header::AUTHORIZATION,
                format!(
                    "AWS4-HMAC-SHA256 Credential={ACCESS_KEY}/{SCOPE_DATE}/{REGION}/s3/aws4_request, \
                     SignedHeaders=host;x-amz-date, Signature=00"
                ),
            )
            .body(())
            .expect("request")
            .into_parts();
        let res = api.handle(&parts, &Bytes::new());
        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
        let body = String::from_utf8_lossy(res.body()).into_owned();
        assert_eq!(xml_text(&body, "Code").as_deref(), Some("NotImplemented"));
    }
}
