mod common;

use axum::http::Method;
use std::time::Duration;

use cloud_uploader::client::api::ApiClient;
use cloud_uploader::client::credentials::Credential;
use cloud_uploader::client::upload::{UploadPipeline, UploadTarget};
use cloud_uploader::client::LocalImageHandle;
use cloud_uploader::common::config::ApiConfig;
use cloud_uploader::common::error::{ClientError, ErrorKind};

use common::{file_handle, write_image, Behavior, FakeApi, Reply, IMAGE_BYTES};

fn pipeline(config: ApiConfig) -> UploadPipeline {
    UploadPipeline::new(ApiClient::new(config).unwrap())
}

fn credential() -> Credential {
    Credential::new("K", "T").unwrap()
}

#[tokio::test]
async fn test_upload_puts_bytes_with_credential_headers() {
    let api = FakeApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let handle = file_handle(&write_image(dir.path(), "cat.jpg"));
    let pipeline = pipeline(api.api_config());

    let receipt = pipeline
        .upload(
            Some(&handle),
            &UploadTarget::for_handle("photos", &handle),
            Some(&credential()),
        )
        .await
        .unwrap();

    assert_eq!(receipt.bytes, IMAGE_BYTES.len());
    assert_eq!(receipt.content_type, "image/jpeg");
    assert_eq!(
        receipt.remote_url,
        format!("{}/files/private/photos/cat.jpg", api.base_url)
    );

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    let put = &requests[0];
    assert_eq!(put.method, Method::PUT);
    assert_eq!(put.path, "/v1/files/private/photos/cat.jpg");
    assert_eq!(put.header("X-Soracom-API-Key"), Some("K"));
    assert_eq!(put.header("X-Soracom-Token"), Some("T"));
    assert_eq!(put.header("content-type"), Some("image/jpeg"));
    assert_eq!(&put.body[..], IMAGE_BYTES);
    assert!(!pipeline.is_in_flight());
}

#[tokio::test]
async fn test_header_names_follow_config() {
    let api = FakeApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let handle = file_handle(&write_image(dir.path(), "cat.jpg"));

    let mut config = api.api_config();
    config.api_key_header = "X-Api-Key".to_string();
    config.token_header = "X-Session-Token".to_string();

    pipeline(config)
        .upload(
            Some(&handle),
            &UploadTarget::for_handle("photos", &handle),
            Some(&credential()),
        )
        .await
        .unwrap();

    let put = &api.requests()[0];
    assert_eq!(put.header("X-Api-Key"), Some("K"));
    assert_eq!(put.header("X-Session-Token"), Some("T"));
    assert_eq!(put.header("X-Soracom-API-Key"), None);
}

#[tokio::test]
async fn test_missing_content_type_falls_back_to_octet_stream() {
    let api = FakeApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(dir.path(), "blob");
    let handle = LocalImageHandle::new(file_handle(&path).uri(), "");

    let receipt = pipeline(api.api_config())
        .upload(
            Some(&handle),
            &UploadTarget::for_handle("raw", &handle),
            Some(&credential()),
        )
        .await
        .unwrap();

    assert_eq!(receipt.content_type, "application/octet-stream");
    let put = &api.requests()[0];
    assert_eq!(put.path, "/v1/files/private/raw/blob");
    assert_eq!(put.header("content-type"), Some("application/octet-stream"));
}

#[tokio::test]
async fn test_failed_preconditions_send_nothing() {
    let api = FakeApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let handle = file_handle(&write_image(dir.path(), "cat.jpg"));
    let pipeline = pipeline(api.api_config());
    let credential = credential();

    let no_handle = pipeline
        .upload(None, &UploadTarget::new("photos", "cat.jpg"), Some(&credential))
        .await
        .unwrap_err();
    assert_eq!(no_handle.to_string(), "Please select an image first");

    for dest in ["", "   ", "/"] {
        let err = pipeline
            .upload(
                Some(&handle),
                &UploadTarget::for_handle(dest, &handle),
                Some(&credential),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please provide a file path");
    }

    let no_credential = pipeline
        .upload(Some(&handle), &UploadTarget::for_handle("photos", &handle), None)
        .await
        .unwrap_err();
    assert_eq!(no_credential.kind(), ErrorKind::Validation);

    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn test_rejection_releases_flag_and_allows_retry() {
    let api = FakeApi::start_with(Behavior {
        upload: Reply::Reject {
            status: 403,
            message: Some("Quota exceeded"),
        },
        ..Behavior::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let handle = file_handle(&write_image(dir.path(), "cat.jpg"));
    let target = UploadTarget::for_handle("photos", &handle);
    let pipeline = pipeline(api.api_config());

    let err = pipeline
        .upload(Some(&handle), &target, Some(&credential()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upload);
    assert_eq!(err.to_string(), "Image upload failed: Quota exceeded");
    assert!(!pipeline.is_in_flight());

    api.set_behavior(|b| b.upload = Reply::Ok);
    pipeline
        .upload(Some(&handle), &target, Some(&credential()))
        .await
        .unwrap();

    assert_eq!(api.request_count(), 2);
}

#[tokio::test]
async fn test_overlapping_upload_is_rejected() {
    let api = FakeApi::start_with(Behavior {
        upload_delay: Duration::from_millis(300),
        ..Behavior::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let handle = file_handle(&write_image(dir.path(), "cat.jpg"));
    let target = UploadTarget::for_handle("photos", &handle);
    let pipeline = pipeline(api.api_config());
    let credential = credential();

    let second = async {
        // Let the first upload claim the flag before trying.
        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.upload(Some(&handle), &target, Some(&credential)).await
    };
    let (first, second) = tokio::join!(
        pipeline.upload(Some(&handle), &target, Some(&credential)),
        second
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(ClientError::UploadInFlight)));
    assert_eq!(api.request_count(), 1);
    assert!(!pipeline.is_in_flight());
}

#[tokio::test]
async fn test_destination_is_encoded_per_segment() {
    let api = FakeApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let handle = file_handle(&write_image(dir.path(), "my cat.jpg"));
    let pipeline = pipeline(api.api_config());

    let cases = [
        ("photos#1", "/v1/files/private/photos%231/my%20cat.jpg"),
        ("photos?v=2", "/v1/files/private/photos%3Fv=2/my%20cat.jpg"),
        ("/albums/2024/", "/v1/files/private/albums/2024/my%20cat.jpg"),
    ];
    for (dest, expected_path) in cases {
        let receipt = pipeline
            .upload(
                Some(&handle),
                &UploadTarget::for_handle(dest, &handle),
                Some(&credential()),
            )
            .await
            .unwrap();

        let put = api.requests().pop().unwrap();
        assert_eq!(put.path, expected_path, "{}", dest);
        let origin = api.base_url.trim_end_matches("/v1");
        assert_eq!(receipt.remote_url, format!("{}{}", origin, expected_path));
    }
    assert_eq!(api.request_count(), cases.len());
}

#[tokio::test]
async fn test_relative_segments_rejected_without_network() {
    let api = FakeApi::start().await;
    let dir = tempfile::tempdir().unwrap();
    let handle = file_handle(&write_image(dir.path(), "cat.jpg"));
    let pipeline = pipeline(api.api_config());

    for dest in ["../../auth", "photos/./2024", "photos/.."] {
        let err = pipeline
            .upload(
                Some(&handle),
                &UploadTarget::for_handle(dest, &handle),
                Some(&credential()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", dest);
    }
    assert_eq!(api.request_count(), 0);
    assert!(!pipeline.is_in_flight());
}
