use crate::{DEFAULT_SERVER_VERSION, ModelError, OsVariant, VariantSelector};

/// **VALUE**: Verifies the (os, arch) → variant mapping for every supported host.
///
/// **WHY THIS MATTERS**: Picking the wrong variant extracts a binary that cannot run
/// on the host, and the failure only shows up as a confusing spawn error.
///
/// **BUG THIS CATCHES**: Would catch a swapped 32/64-bit Windows mapping or a
/// case-sensitivity regression on names like "Mac OS X".
#[test]
fn given_supported_hosts_when_from_host_called_then_maps_to_variant() {
    // GIVEN: Known host identifications
    let cases = [
        ("windows", "x86_64", OsVariant::Windows64),
        ("Windows 10", "amd64", OsVariant::Windows64),
        ("windows", "x86", OsVariant::Windows32),
        ("Windows XP", "i686", OsVariant::Windows32),
        ("linux", "x86_64", OsVariant::Unix),
        ("Linux", "aarch64", OsVariant::Unix),
        ("macos", "aarch64", OsVariant::MacOs),
        ("Mac OS X", "x86_64", OsVariant::MacOs),
        ("darwin", "arm64", OsVariant::MacOs),
    ];

    for (os, arch, expected) in cases {
        // WHEN: Mapping the host
        let variant = OsVariant::from_host(os, arch);

        // THEN: Should pick the expected variant
        assert_eq!(
            variant.unwrap_or_else(|e| panic!("{os}/{arch} should be supported: {e}")),
            expected,
            "{os}/{arch}"
        );
    }
}

/// **VALUE**: Verifies unknown platforms fail loudly instead of guessing.
///
/// **WHY THIS MATTERS**: Falling back to some other variant would spawn a binary
/// for the wrong OS; failing at construction is the only useful outcome.
#[test]
fn given_unsupported_hosts_when_from_host_called_then_returns_unsupported_platform() {
    // GIVEN: Host identifications outside the supported set
    let cases = [
        ("freebsd", "x86_64"),
        ("solaris", "sparc"),
        ("windows", "aarch64"),
        ("linux", "riscv64"),
        ("macos", "x86"),
    ];

    for (os, arch) in cases {
        // WHEN: Mapping the host
        let result = OsVariant::from_host(os, arch);

        // THEN: Should be an UnsupportedPlatform error naming both values
        match result {
            Err(ModelError::UnsupportedPlatform {
                os: err_os,
                arch: err_arch,
                message,
                ..
            }) => {
                assert_eq!(err_os, os);
                assert_eq!(err_arch, arch);
                assert!(message.contains(os), "message should name os: {message}");
            }
            other => panic!("{os}/{arch} should be unsupported, got {other:?}"),
        }
    }
}

/// **VALUE**: Verifies executable names per variant.
#[test]
fn given_variants_when_executable_name_called_then_windows_gets_exe_suffix() {
    assert_eq!(
        OsVariant::Windows32.executable_name("redis-server"),
        "redis-server.exe"
    );
    assert_eq!(
        OsVariant::Windows64.executable_name("redis-server"),
        "redis-server.exe"
    );
    assert_eq!(OsVariant::Unix.executable_name("redis-server"), "redis-server");
    assert_eq!(OsVariant::MacOs.executable_name("redis-server"), "redis-server");
}

/// **VALUE**: Verifies `FromStr` accepts exactly the repository directory names.
///
/// **WHY THIS MATTERS**: The CLI `--os-variant` flag and the config file both parse
/// through `FromStr`; accepting anything else would look up a missing directory.
#[test]
fn given_variant_names_when_parsed_then_round_trip_through_as_str() {
    for variant in OsVariant::ALL {
        let parsed: OsVariant = variant.as_str().parse().expect("known variant");
        assert_eq!(parsed, variant);
    }

    assert!("linux".parse::<OsVariant>().is_err());
    assert!("Windows-64".parse::<OsVariant>().is_err());
}

/// **VALUE**: Verifies the default selector auto-detects and uses the default version.
#[test]
fn given_default_selector_when_inspected_then_uses_default_version_and_auto_detect() {
    // GIVEN: A default selector
    let selector = VariantSelector::default();

    // THEN: Default version with no explicit variant
    assert_eq!(selector.version, DEFAULT_SERVER_VERSION);
    assert_eq!(selector.os_variant, None);
}

/// **VALUE**: Verifies an explicit variant wins over host detection.
///
/// **WHY THIS MATTERS**: Cross-platform packaging tests pin a variant that is not
/// the host's; detection must not override it.
#[test]
fn given_explicit_variant_when_resolve_variant_called_then_returns_it() {
    // GIVEN: Selector pinned to Windows 32-bit
    let selector = VariantSelector::default()
        .with_version("3.0.0")
        .with_os_variant(OsVariant::Windows32);

    // WHEN: Resolving
    let variant = selector.resolve_variant().expect("explicit variant");

    // THEN: Pinned variant is used
    assert_eq!(variant, OsVariant::Windows32);
    assert_eq!(selector.version, "3.0.0");
}

/// **VALUE**: Verifies an empty version is rejected before any lookup.
#[test]
fn given_blank_version_when_resolve_variant_called_then_returns_validation_error() {
    let selector = VariantSelector::default()
        .with_version("  ")
        .with_os_variant(OsVariant::Unix);

    assert!(matches!(
        selector.resolve_variant(),
        Err(ModelError::Validation { .. })
    ));
}
