//! Tune provisioning against a stand-in tagutil.

#![cfg(unix)]

mod common;

use pretty_assertions::assert_eq;
use tagutil_harness::{HarnessError, Severity};
use tagutil_tags::{Container, Format, TagList};

#[test]
fn tunes_are_byte_identical_copies() {
    let mut session = common::session_for(common::fake_tagutil());
    let workspace = session.setup().unwrap().to_path_buf();

    for container in Container::ALL {
        let tune = session.create_tune("blank", container.extension()).unwrap();
        assert_eq!(tune.path, workspace.join(format!("blank.{}", container)));
        assert_eq!(tune.file_name, format!("blank.{}", container));

        let fixture = session.fixtures().for_container(container).unwrap();
        let copied = blake3::hash(&std::fs::read(&tune.path).unwrap()).to_hex().to_string();
        assert_eq!(copied, fixture.digest().unwrap());
    }
}

#[test]
fn unsupported_extension_creates_nothing() {
    let mut session = common::session_for(common::fake_tagutil());
    let workspace = session.setup().unwrap().to_path_buf();

    let err = session.create_tune("track", "wav").unwrap_err();
    assert!(err.to_string().contains("wav"));
    assert_eq!(err.severity(), Severity::ScenarioSetup);
    assert!(!workspace.join("track.wav").exists());
}

#[test]
fn bad_tune_names_are_rejected() {
    let mut session = common::session_for(common::fake_tagutil());
    session.setup().unwrap();

    for name in ["", "..", "../outside", "sub/track"] {
        let err = session.create_tune(name, "flac").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidTuneName { .. }), "{}", name);
    }
}

#[test]
fn silent_load_tags_the_tune() {
    let mut session = common::session_for(common::fake_tagutil());
    session.setup().unwrap();
    let tags = TagList::new()
        .with("artist", "Kyuss")
        .with("title", "Gardenia")
        .with("track", "1");

    session.create_tagged_tune("track", "ogg", &tags).unwrap();
    session.print_tags("track.ogg", Format::Yaml).unwrap();
    session.expect_success();
    session.expect_tag_list(Format::Yaml, &tags);
}

#[test]
fn untagged_tune_prints_empty_list() {
    let mut session = common::session_for(common::fake_tagutil());
    session.setup().unwrap();

    session.create_tune("track", "mp3").unwrap();
    session.print_tags("track.mp3", Format::Yaml).unwrap();
    session.expect_empty_tag_list(Format::Yaml);
    session.print_tags("track.mp3", Format::Json).unwrap();
    session.debug_dump();
    session.expect_empty_tag_list(Format::Json);
}

#[test]
fn noisy_load_fails_provisioning() {
    let mut session = common::session_for(common::fake_tagutil());
    session.setup().unwrap();
    session.set_env(common::NOISE_VAR, "tagutil: warning: ignoring stray key");
    let tags = TagList::new().with("artist", "Kyuss");

    let err = session.create_tagged_tune("track", "flac", &tags).unwrap_err();
    match err {
        HarnessError::ProvisioningFailed {
            success, output, ..
        } => {
            assert!(success);
            assert_eq!(output, "tagutil: warning: ignoring stray key\n");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn failing_load_fails_provisioning() {
    let mut session = common::session_for(common::fake_tagutil());
    session.setup().unwrap();
    session.set_env(common::FAIL_VAR, "1");
    let tags = TagList::new().with("artist", "Kyuss");

    let err = session.create_tagged_tune("track", "flac", &tags).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::ProvisioningFailed {
            success: false,
            exit_code: Some(3),
            ..
        }
    ));
    assert!(!err.is_fatal());
}
