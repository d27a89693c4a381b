mod common;

use common::{EventLog, TestResult, init_logger};
use std::io::Write;
use xmldigest::{DigestError, Digester, DigesterConfig, MandatoryPlacement};

#[test]
fn test_config_file_drives_the_digester() -> TestResult {
    init_logger();
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r#"{{ "trim-body-text": true, "mandatory-placement": "before-universal" }}"#
    )?;

    let config = DigesterConfig::from_file(file.path())?;
    assert_eq!(config.mandatory_placement, MandatoryPlacement::BeforeUniversal);
    assert!(config.namespace_aware);

    let log = EventLog::new();
    let mut digester = Digester::with_config(config);
    digester
        .add_rule("!*", log.recorder("U"))?
        .add_mandatory_action(log.recorder("M"))?;
    digester.parse_str("<a>  padded  </a>")?;

    assert_eq!(log.of("begin"), vec!["begin(M,/a)", "begin(U,/a)"]);
    assert_eq!(log.of("body"), vec!["body(M,/a,padded)", "body(U,/a,padded)"]);
    Ok(())
}

#[test]
fn test_config_round_trips_through_json() -> TestResult {
    let config = DigesterConfig {
        trim_body_text: true,
        namespace_aware: false,
        mandatory_placement: MandatoryPlacement::BeforeUniversal,
    };
    let json = serde_json::to_string(&config)?;
    assert!(json.contains("\"namespace-aware\":false"));
    assert_eq!(DigesterConfig::from_json(&json)?, config);
    Ok(())
}

#[test]
fn test_bad_config_is_a_config_error() {
    assert!(matches!(
        DigesterConfig::from_json(r#"{ "mandatory-placement": "sideways" }"#),
        Err(DigestError::Config(_))
    ));
    assert!(matches!(
        DigesterConfig::from_file("/definitely/not/here.json"),
        Err(DigestError::Io(_))
    ));
}
