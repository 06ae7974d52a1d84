//! XML response bodies.
//!
//! Three documents leave this gateway: `ListAllMyBucketsResult`,
//! `ListBucketResult`, and the `<Error>` envelope. All text nodes go
//! through the writer, which escapes them.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

use sledgate_core::timefmt::iso8601_gmt;
use sledgate_store::ListResult;

/// The S3 XML namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Render the `<Error>` envelope.
#[must_use]
pub fn error_xml(code: &str, message: &str, resource: &str, request_id: &str) -> Vec<u8> {
    render(|writer| {
        writer
            .create_element("Error")
            .write_inner_content(|w| {
                write_text_element(w, "Code", code)?;
                write_text_element(w, "Message", message)?;
                write_text_element(w, "Resource", resource)?;
                write_text_element(w, "RequestId", request_id)
            })?;
        Ok(())
    })
}

/// Render `ListAllMyBucketsResult`.
///
/// Buckets carry no stored creation time, so every entry reports the
/// current server time.
#[must_use]
pub fn list_buckets_xml(buckets: &[String], now_epoch_seconds: i64) -> Vec<u8> {
    let creation_date = iso8601_gmt(now_epoch_seconds);
    render(|writer| {
        writer
            .create_element("ListAllMyBucketsResult")
            .with_attribute(("xmlns", S3_NAMESPACE))
            .write_inner_content(|w| {
                w.create_element("Owner").write_inner_content(|w| {
                    write_text_element(w, "ID", "")?;
                    write_text_element(w, "DisplayName", "")
                })?;
                w.create_element("Buckets").write_inner_content(|w| {
                    for bucket in buckets {
                        w.create_element("Bucket").write_inner_content(|w| {
                            write_text_element(w, "Name", bucket)?;
                            write_text_element(w, "CreationDate", &creation_date)
                        })?;
                    }
                    Ok(())
                })?;
                Ok(())
            })?;
        Ok(())
    })
}

/// Render `ListBucketResult` for a `ListObjectsV2` response.
///
/// `max_keys` is echoed as requested; `continuation_token` is echoed only
/// when the request supplied one.
#[must_use]
pub fn list_bucket_result_xml(
    bucket: &str,
    prefix: &str,
    max_keys: i64,
    continuation_token: &str,
    result: &ListResult,
) -> Vec<u8> {
    render(|writer| {
        writer
            .create_element("ListBucketResult")
            .with_attribute(("xmlns", S3_NAMESPACE))
            .write_inner_content(|w| {
                write_text_element(w, "Name", bucket)?;
                write_text_element(w, "Prefix", prefix)?;
                write_text_element(w, "MaxKeys", &max_keys.to_string())?;
                write_text_element(w, "KeyCount", &result.objects.len().to_string())?;
                write_text_element(
                    w,
                    "IsTruncated",
                    if result.is_truncated { "true" } else { "false" },
                )?;
                if !continuation_token.is_empty() {
                    write_text_element(w, "ContinuationToken", continuation_token)?;
                }
                if result.is_truncated {
                    if let Some(token) = &result.next_continuation_token {
                        write_text_element(w, "NextContinuationToken", token)?;
                    }
                }
                for obj in &result.objects {
                    w.create_element("Contents").write_inner_content(|w| {
                        write_text_element(w, "Key", &obj.key)?;
                        write_text_element(w, "LastModified", &iso8601_gmt(obj.meta.mtime))?;
                        write_text_element(w, "ETag", &format!("\"{}\"", obj.meta.etag))?;
                        write_text_element(w, "Size", &obj.meta.size.to_string())?;
                        write_text_element(w, "StorageClass", "STANDARD")
                    })?;
                }
                Ok(())
            })?;
        Ok(())
    })
}

/// Run a rendering closure over a fresh writer with the XML declaration
/// already emitted.
fn render<F>(fill: F) -> Vec<u8>
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> io::Result<()>,
{
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);
    // Writing into a Vec cannot fail; the io::Result plumbing exists for
    // the Writer API.
    let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));
    let _ = fill(&mut writer);
    buf
}

/// Write a `<tag>text</tag>` element.
fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}
