use server_core::error::CoreError;
use server_core::error::lifecycle::LifecycleError;
use server_core::error::port::PortError;
use server_core::error::provision::ProvisionError;

use common::ErrorLocation;
use models::ModelError;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::panic::Location;

/// **VALUE**: Verifies `LifecycleError::Spawn` carries location and the OS error as source.
///
/// **WHY THIS MATTERS**: "permission denied" alone does not say whether the executable bit
/// or the scratch directory is at fault; the source chain plus location narrows it down.
///
/// **BUG THIS CATCHES**: Would catch the `#[source]` attribute being dropped, which hides
/// the OS error from `anyhow`-style reporters.
#[test]
#[track_caller]
fn given_spawn_error_when_formatted_then_includes_location_and_source() {
    // GIVEN: A Spawn error wrapping an IO error
    let err = LifecycleError::Spawn {
        message: "Failed to launch /tmp/redis-server-x/redis-server".to_string(),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(IoError::new(ErrorKind::PermissionDenied, "permission denied")),
    };

    // WHEN: Formatting
    let error_string = format!("{err}");

    // THEN: Type, message and file present; source reachable
    assert!(error_string.contains("Spawn Error"));
    assert!(error_string.contains("Failed to launch"));
    assert!(error_string.contains("error.rs"));
    assert_eq!(
        err.source().map(|s| s.to_string()),
        Some("permission denied".to_string())
    );
}

/// **VALUE**: Verifies `PortInUse` keeps the port and owner and stays transparent when wrapped.
#[test]
#[track_caller]
fn given_port_in_use_when_wrapped_then_display_unchanged() {
    // GIVEN: A port error
    let err = PortError::PortInUse {
        port: 6379,
        owner_pid: Some(4242),
        message: "Port 6379 is already in use by PID 4242".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };
    let direct = err.to_string();

    // WHEN: Wrapped into lifecycle and core errors
    let core = CoreError::from(LifecycleError::from(err));

    // THEN: Same text, variant still matchable
    assert_eq!(core.to_string(), direct);
    assert!(direct.starts_with("Port In Use Error"));
    assert!(matches!(
        core,
        CoreError::Lifecycle(LifecycleError::Port(PortError::PortInUse {
            port: 6379,
            owner_pid: Some(4242),
            ..
        }))
    ));
}

/// **VALUE**: Verifies model errors map onto the matching provision variants.
///
/// **WHY THIS MATTERS**: Callers match on `UnsupportedPlatform` to skip tests on exotic
/// hosts; collapsing it into `Validation` would turn skips into failures.
#[test]
#[track_caller]
fn given_model_errors_when_converted_then_variants_preserved() {
    let unsupported = ProvisionError::from(ModelError::UnsupportedPlatform {
        os: "freebsd".to_string(),
        arch: "x86_64".to_string(),
        message: "No executable variant for freebsd/x86_64".to_string(),
        location: ErrorLocation::from(Location::caller()),
    });
    let invalid = ProvisionError::from(ModelError::Validation {
        message: "Version cannot be empty".to_string(),
        location: ErrorLocation::from(Location::caller()),
    });

    assert!(matches!(
        unsupported,
        ProvisionError::UnsupportedPlatform { ref message, .. } if message.contains("freebsd")
    ));
    assert!(matches!(invalid, ProvisionError::Validation { .. }));
}

/// **VALUE**: Verifies `StartupFailed` reads as a startup failure, not a spawn failure.
#[test]
#[track_caller]
fn given_startup_failed_when_formatted_then_names_the_failure() {
    let err = LifecycleError::StartupFailed {
        message: "Server on port 6379 closed its output before signalling readiness".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    let error_string = err.to_string();

    assert!(error_string.starts_with("Startup Failed Error"));
    assert!(error_string.contains("6379"));
    assert!(err.source().is_none());
}
