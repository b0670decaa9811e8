//! End-to-end artifact installs against a local HTTP server.

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use tooldock_core::{
    Arch, Artifact, ArtifactManifest, Error, InstallStrategy, Os, Platform, Tool, ToolPaths,
    VersionArtifacts,
};
use tooldock_tools_artifact::{ArtifactError, ArtifactInstaller, ArtifactOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LINUX_AMD64: Platform = Platform {
    os: Os::Linux,
    arch: Arch::X86_64,
};

fn tar_gz(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in members {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn tool(name: &str, url: String, sha256: String, extract_path: Option<&str>) -> Tool {
    let artifacts = VersionArtifacts {
        linux_amd64: Some(Artifact {
            url,
            sha256,
            extract_path: extract_path.map(String::from),
        }),
        ..VersionArtifacts::default()
    };
    let manifest = ArtifactManifest {
        default_version: "1.4.1".into(),
        versions: BTreeMap::from([("1.4.1".to_string(), artifacts)]),
    };
    Tool::new(name)
        .with_detect_command(format!("{name} version"))
        .with_strategy(InstallStrategy::Artifacts(manifest))
}

fn installer(root: &std::path::Path) -> ArtifactInstaller {
    ArtifactInstaller::new(ToolPaths::new(root))
        .unwrap()
        .with_platform(LINUX_AMD64)
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>, expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(expected_hits)
        .mount(server)
        .await;
}

fn inner(err: &Error) -> &ArtifactError {
    match err {
        Error::Install { source, .. } => source
            .downcast_ref::<ArtifactError>()
            .expect("artifact error source"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn installs_once_and_reuses_the_managed_binary() {
    let server = MockServer::start().await;
    let archive = tar_gz(&[("syft_1.4.1/README.md", b"docs"), ("syft_1.4.1/syft", b"syft-bin")]);
    serve(&server, "/syft_1.4.1_linux_amd64.tar.gz", archive.clone(), 1).await;

    let root = tempfile::TempDir::new().unwrap();
    let installer = installer(root.path());
    let tool = tool(
        "syft",
        format!("{}/syft_1.4.1_linux_amd64.tar.gz", server.uri()),
        sha256(&archive).to_uppercase(),
        None,
    );

    let first = installer.install(&tool, &ArtifactOptions::default()).await.unwrap();
    assert!(first.verified);
    assert_eq!(first.version, "1.4.1");
    assert_eq!(
        first.binary_path,
        root.path().join("bin").join("syft@1.4.1").join("syft")
    );
    assert_eq!(std::fs::read(&first.binary_path).unwrap(), b"syft-bin");
    assert!(
        root.path()
            .join("cache/syft/1.4.1/syft_1.4.1_linux_amd64.tar.gz")
            .is_file()
    );

    let second = installer.install(&tool, &ArtifactOptions::default()).await.unwrap();
    assert_eq!(second, first);
    // MockServer verifies the single expected request on drop.
}

#[tokio::test]
async fn force_reextracts_from_the_cache() {
    let server = MockServer::start().await;
    let archive = tar_gz(&[("grype", b"grype-bin")]);
    serve(&server, "/grype.tar.gz", archive.clone(), 1).await;

    let root = tempfile::TempDir::new().unwrap();
    let installer = installer(root.path());
    let tool = tool(
        "grype",
        format!("{}/grype.tar.gz", server.uri()),
        sha256(&archive),
        None,
    );

    let first = installer.install(&tool, &ArtifactOptions::default()).await.unwrap();
    std::fs::write(&first.binary_path, b"clobbered").unwrap();

    let forced = installer
        .install(
            &tool,
            &ArtifactOptions {
                force: true,
                ..ArtifactOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(std::fs::read(&forced.binary_path).unwrap(), b"grype-bin");
}

#[tokio::test]
async fn checksum_mismatch_leaves_no_binary_and_drops_the_cache() {
    let server = MockServer::start().await;
    let archive = tar_gz(&[("trivy", b"trivy-bin")]);
    serve(&server, "/trivy.tar.gz", archive, 1).await;

    let root = tempfile::TempDir::new().unwrap();
    let installer = installer(root.path());
    let tool = tool(
        "trivy",
        format!("{}/trivy.tar.gz", server.uri()),
        "0".repeat(64),
        None,
    );

    let err = installer
        .install(&tool, &ArtifactOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Install { ref step, .. } if step == "verify"));
    assert!(matches!(inner(&err), ArtifactError::ChecksumMismatch { .. }));
    assert!(!root.path().join("bin/trivy@1.4.1/trivy").exists());
    assert!(!root.path().join("cache/trivy/1.4.1/trivy.tar.gz").exists());
}

#[tokio::test]
async fn traversal_member_rejects_the_whole_archive() {
    let server = MockServer::start().await;
    let archive = tar_gz(&[("hadolint", b"bin"), ("../../escaped", b"owned")]);
    serve(&server, "/hadolint.tar.gz", archive.clone(), 1).await;

    let root = tempfile::TempDir::new().unwrap();
    let installer = installer(root.path());
    let tool = tool(
        "hadolint",
        format!("{}/hadolint.tar.gz", server.uri()),
        sha256(&archive),
        None,
    );

    let err = installer
        .install(&tool, &ArtifactOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(inner(&err), ArtifactError::PathTraversal { .. }));
    assert!(!root.path().join("bin/hadolint@1.4.1").exists());
    assert!(!root.path().join("escaped").exists());
    assert!(!root.path().join("bin/escaped").exists());
}

#[tokio::test]
async fn unknown_version_and_platform_fail_before_any_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = tempfile::TempDir::new().unwrap();
    let tool = tool(
        "syft",
        format!("{}/syft.tar.gz", server.uri()),
        "0".repeat(64),
        None,
    );

    let err = installer(root.path())
        .install(
            &tool,
            &ArtifactOptions {
                version: Some("9.9.9".into()),
                ..ArtifactOptions::default()
            },
        )
        .await
        .unwrap_err();
    match err {
        Error::VersionNotFound { available, .. } => {
            assert_eq!(available.as_slice(), ["1.4.1".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = installer(root.path())
        .with_platform(Platform::new(Os::Darwin, Arch::Arm64))
        .install(&tool, &ArtifactOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ArtifactUnavailable { ref platform, .. } if platform == "darwin_arm64"));
}

#[tokio::test]
async fn local_archive_with_extract_path() {
    let bytes = zip(&[
        ("shellcheck-v0.10.0/README.txt", b"docs"),
        ("shellcheck-v0.10.0/bin/shellcheck", b"sc-bin"),
    ]);
    let root = tempfile::TempDir::new().unwrap();
    let local = root.path().join("shellcheck.zip");
    std::fs::write(&local, &bytes).unwrap();

    let tool = tool(
        "shellcheck",
        "https://invalid.example/shellcheck.zip".into(),
        sha256(&bytes),
        Some("bin/shellcheck"),
    );
    let installed = installer(root.path())
        .install(
            &tool,
            &ArtifactOptions {
                from_file: Some(local.clone()),
                ..ArtifactOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(std::fs::read(&installed.binary_path).unwrap(), b"sc-bin");
    assert!(local.is_file());
}
