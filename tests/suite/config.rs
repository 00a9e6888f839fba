//! Drivers built from configuration files.

use std::io::Write;

use exact_config::ExactConfig;
use exact_core::{ExecError, Real, RetryDriver, ScheduleParams, SetupError, schedule};
use tempfile::NamedTempFile;

use crate::common::vanishing;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn driver_settings_come_from_the_file() {
    let file = config_file("[driver]\nmax_iterations = 3\nstep_increment = 2\n");
    let config = ExactConfig::load_from(file.path()).unwrap().unwrap();
    let driver = RetryDriver::from_config(&config).unwrap();
    assert_eq!(driver.settings().max_iterations(), Some(3));

    let result = driver.run(|| Real::from(1) / vanishing()?);
    match result.unwrap_err() {
        ExecError::IterationLimit { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn a_different_schedule_conflicts_with_the_installed_one() {
    // the default schedule is installed by the first computation of the process
    let _ = schedule();
    let file = config_file("[precision]\nstart = -30\n");
    let config = ExactConfig::load_from(file.path()).unwrap().unwrap();
    assert_ne!(config.schedule_params().unwrap(), ScheduleParams::default());
    assert!(matches!(
        RetryDriver::from_config(&config),
        Err(SetupError::Schedule(_))
    ));
}
