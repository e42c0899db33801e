//! Tests for the layout installation flow
//!
//! These tests verify:
//! - Aggregated validation with zero side effects on failure
//! - Payload copies, registry registration and cache purge on success
//! - Duplicate registration on re-run
//! - Failure after mutation has started (malformed registry)
//! - Dry-run and cache-only modes

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use us_split_installer::{
    AccessProbe, InstallOutcome, InstallOverrides, InstallRequest, InstallStage, Installer,
    InstallerError, LayoutDescriptor, ObstructionKind, PayloadKind, SystemProbe, ValidationReport,
    purge_cache_only,
};
use xmltree::{Element, XMLNode};

const REGISTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xkbConfigRegistry version="1.1">
  <modelList>
    <model><configItem><name>pc105</name></configItem></model>
  </modelList>
  <layoutList>
    <layout>
      <configItem>
        <name>us</name>
        <shortDescription>en</shortDescription>
        <description>English (US)</description>
        <description xml:lang="de">Englisch (US)</description>
        <languageList><iso639Id>eng</iso639Id></languageList>
      </configItem>
    </layout>
  </layoutList>
</xkbConfigRegistry>
"#;

const SYMBOLS: &str = "default partial alphanumeric_keys\nxkb_symbols \"basic\" {\n};\n";

/// Scratch XKB tree plus a source directory holding the payloads
struct Fixture {
    _dir: TempDir,
    xkb: PathBuf,
    source: PathBuf,
    cache: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let xkb = dir.path().join("xkb");
        let source = dir.path().join("src");
        let cache = dir.path().join("cache");

        for sub in ["symbols", "types", "compat", "rules"] {
            fs::create_dir_all(xkb.join(sub)).unwrap();
        }
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&cache).unwrap();

        fs::write(xkb.join("rules/evdev.xml"), REGISTRY).unwrap();
        fs::write(source.join("us_split_v3"), SYMBOLS).unwrap();
        fs::write(source.join("types-threelevelwithshift"), "xkb_types \"t\" {};\n").unwrap();
        fs::write(source.join("compat-threelevelwithshift"), "xkb_compat \"c\" {};\n").unwrap();
        fs::write(cache.join("server-0.xkm"), "compiled").unwrap();
        fs::write(cache.join("README.txt"), "keep").unwrap();

        Self {
            _dir: dir,
            xkb,
            source,
            cache,
        }
    }

    fn overrides(&self) -> InstallOverrides {
        InstallOverrides {
            target_directory: Some(self.xkb.clone()),
            symbols_source: Some(self.source.join("us_split_v3")),
            cache_directory: Some(self.cache.clone()),
            ..Default::default()
        }
    }

    fn request(&self) -> InstallRequest {
        InstallRequest::new(self.overrides(), &self.source).unwrap()
    }

    fn registry(&self) -> PathBuf {
        self.xkb.join("rules/evdev.xml")
    }

    fn registry_text(&self) -> String {
        fs::read_to_string(self.registry()).unwrap()
    }
}

/// Probe that reports selected paths as read-only
struct ReadOnly(Vec<PathBuf>);

impl AccessProbe for ReadOnly {
    fn exists(&self, path: &Path) -> bool {
        SystemProbe.exists(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        !self.0.iter().any(|p| p == path) && SystemProbe.is_writable(path)
    }
}

fn obstructed(outcome: InstallOutcome) -> ValidationReport {
    match outcome {
        InstallOutcome::Obstructed(report) => report,
        InstallOutcome::Installed(report) => panic!("expected obstruction, got {:?}", report),
    }
}

/// All `<layout>` elements under every `<layoutList>` of the registry
fn registry_layouts(path: &Path) -> Vec<Element> {
    let root = Element::parse(fs::read(path).unwrap().as_slice()).unwrap();
    root.children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(|e| e.name == "layoutList")
        .flat_map(|list| list.children.iter().filter_map(XMLNode::as_element))
        .filter(|e| e.name == "layout")
        .cloned()
        .collect()
}

fn child_text(element: &Element, path: &[&str]) -> Option<String> {
    let mut current = element;
    for name in path {
        current = current.get_child(*name)?;
    }
    current.get_text().map(|t| t.into_owned())
}

// =============================================================================
// Successful installation
// =============================================================================

#[test]
fn test_install_copies_registers_and_purges() {
    let fx = Fixture::new();
    let before = registry_layouts(&fx.registry()).len();

    let mut installer = Installer::new();
    let outcome = installer.install(&fx.request()).unwrap();
    assert_eq!(installer.stage(), InstallStage::Done);

    let report = match outcome {
        InstallOutcome::Installed(report) => report,
        other => panic!("expected success, got {:?}", other),
    };
    assert!(!report.dry_run);
    assert_eq!(report.copied.len(), 3);
    assert_eq!(report.layout_lists_updated, 1);
    assert_eq!(report.cache_removed, vec![fx.cache.join("server-0.xkm")]);

    // Byte-for-byte copies
    assert_eq!(fs::read(fx.xkb.join("symbols/us_split_v3")).unwrap(), SYMBOLS.as_bytes());
    assert_eq!(
        fs::read(fx.xkb.join("types/threelevelwithshift")).unwrap(),
        fs::read(fx.source.join("types-threelevelwithshift")).unwrap()
    );
    assert_eq!(
        fs::read(fx.xkb.join("compat/threelevelwithshift")).unwrap(),
        fs::read(fx.source.join("compat-threelevelwithshift")).unwrap()
    );

    // Exactly one new descriptor
    let layouts = registry_layouts(&fx.registry());
    assert_eq!(layouts.len(), before + 1);
    let added = layouts.last().unwrap();
    assert_eq!(child_text(added, &["configItem", "name"]).as_deref(), Some("us_split_v3"));
    assert_eq!(
        child_text(added, &["configItem", "languageList", "iso639Id"]).as_deref(),
        Some("eng")
    );
    assert_eq!(
        child_text(added, &["configItem", "countryList", "iso3166Id"]).as_deref(),
        Some("US")
    );

    // Host entries keep their qualified attributes
    let registry = fx.registry_text();
    assert!(registry.contains(r#"<description xml:lang="de">Englisch (US)</description>"#));

    // Cache purge spared non-cache files
    assert!(!fx.cache.join("server-0.xkm").exists());
    assert!(fx.cache.join("README.txt").exists());
}

#[test]
fn test_install_uses_requested_basename() {
    let fx = Fixture::new();
    let overrides = InstallOverrides {
        symbols_target_basename: Some("us_split".to_string()),
        ..fx.overrides()
    };
    let request = InstallRequest::new(overrides, &fx.source).unwrap();

    Installer::new().install(&request).unwrap();

    assert!(fx.xkb.join("symbols/us_split").exists());
    assert!(!fx.xkb.join("symbols/us_split_v3").exists());
    let layouts = registry_layouts(&fx.registry());
    assert_eq!(
        child_text(layouts.last().unwrap(), &["configItem", "name"]).as_deref(),
        Some("us_split")
    );
}

#[test]
fn test_install_overwrites_existing_payload() {
    let fx = Fixture::new();
    fs::write(fx.xkb.join("symbols/us_split_v3"), "stale").unwrap();

    Installer::new().install(&fx.request()).unwrap();

    assert_eq!(fs::read(fx.xkb.join("symbols/us_split_v3")).unwrap(), SYMBOLS.as_bytes());
}

#[test]
fn test_install_twice_duplicates_entry() {
    let fx = Fixture::new();
    let before = registry_layouts(&fx.registry()).len();

    Installer::new().install(&fx.request()).unwrap();
    Installer::new().install(&fx.request()).unwrap();

    let layouts = registry_layouts(&fx.registry());
    assert_eq!(layouts.len(), before + 2);
    assert_eq!(layouts[layouts.len() - 1], layouts[layouts.len() - 2]);
}

#[test]
fn test_install_without_layout_list_still_copies() {
    let fx = Fixture::new();
    let registry = "<xkbConfigRegistry><modelList/></xkbConfigRegistry>";
    fs::write(fx.registry(), registry).unwrap();

    let outcome = Installer::new().install(&fx.request()).unwrap();

    match outcome {
        InstallOutcome::Installed(report) => assert_eq!(report.layout_lists_updated, 0),
        other => panic!("expected success, got {:?}", other),
    }
    assert!(fx.xkb.join("symbols/us_split_v3").exists());
    assert!(registry_layouts(&fx.registry()).is_empty());
}

#[test]
fn test_install_with_variant_list_and_no_auxiliaries() {
    let fx = Fixture::new();
    let layout = LayoutDescriptor {
        country_tag: None,
        variant_list: true,
        ..LayoutDescriptor::us_split_v3()
    };
    let request = InstallRequest::for_layout(fx.overrides(), &fx.source, layout, &[]).unwrap();

    Installer::new().install(&request).unwrap();

    assert!(!fx.xkb.join("types/threelevelwithshift").exists());
    let layouts = registry_layouts(&fx.registry());
    let added = layouts.last().unwrap();
    assert!(added.get_child("variantList").is_some());
    assert!(child_text(added, &["configItem", "countryList", "iso3166Id"]).is_none());
}

// =============================================================================
// Validation failures
// =============================================================================

#[test]
fn test_missing_preconditions_are_all_reported() {
    let fx = Fixture::new();
    fs::remove_file(fx.source.join("us_split_v3")).unwrap();
    fs::remove_file(fx.source.join("compat-threelevelwithshift")).unwrap();
    fs::remove_dir(fx.xkb.join("types")).unwrap();
    fs::remove_file(fx.registry()).unwrap();
    let cache_before: Vec<_> = fs::read_dir(&fx.cache).unwrap().collect();

    let mut installer = Installer::new();
    let report = obstructed(installer.install(&fx.request()).unwrap());
    assert_eq!(installer.stage(), InstallStage::Aborted);

    let kinds: Vec<ObstructionKind> = report.obstructions().iter().map(|o| o.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            ObstructionKind::MissingSource(PayloadKind::Symbols),
            ObstructionKind::MissingDirectory(PayloadKind::Types),
            ObstructionKind::UnwritableDirectory(PayloadKind::Types),
            ObstructionKind::MissingSource(PayloadKind::Compat),
            ObstructionKind::MissingRegistry,
            ObstructionKind::UnwritableRegistry,
        ]
    );

    // Nothing touched
    assert!(!fx.xkb.join("symbols/us_split_v3").exists());
    assert!(!fx.xkb.join("compat/threelevelwithshift").exists());
    assert_eq!(fs::read_dir(&fx.cache).unwrap().count(), cache_before.len());
    assert!(fx.cache.join("server-0.xkm").exists());
}

#[test]
fn test_unwritable_registry_is_single_obstruction() {
    let fx = Fixture::new();
    let registry_before = fx.registry_text();

    let mut installer = Installer::with_probe(ReadOnly(vec![fx.registry()]));
    let report = obstructed(installer.install(&fx.request()).unwrap());

    assert_eq!(report.obstructions().len(), 1);
    assert_eq!(report.obstructions()[0].kind, ObstructionKind::UnwritableRegistry);
    assert!(report.messages()[0].contains("evdev.xml"));

    assert!(!fx.xkb.join("symbols/us_split_v3").exists());
    assert_eq!(fx.registry_text(), registry_before);
}

#[test]
fn test_unwritable_cache_blocks_install() {
    let fx = Fixture::new();

    let mut installer = Installer::with_probe(ReadOnly(vec![fx.cache.clone()]));
    let report = obstructed(installer.install(&fx.request()).unwrap());

    assert_eq!(
        report.messages(),
        vec![format!(
            "Cannot delete cache files: no write permission to {}",
            fx.cache.display()
        )]
    );
    assert!(!fx.xkb.join("symbols/us_split_v3").exists());
    assert!(fx.cache.join("server-0.xkm").exists());
}

#[test]
fn test_unwritable_symbols_directory() {
    let fx = Fixture::new();
    let symbols_dir = fx.xkb.join("symbols");

    let mut installer = Installer::with_probe(ReadOnly(vec![symbols_dir.clone()]));
    let report = obstructed(installer.install(&fx.request()).unwrap());

    assert_eq!(
        report.messages(),
        vec![format!("Cannot write the symbols directory {}", symbols_dir.display())]
    );
}

// =============================================================================
// Unexpected failures
// =============================================================================

#[test]
fn test_malformed_registry_aborts_after_copy() {
    let fx = Fixture::new();
    fs::write(fx.registry(), "<xkbConfigRegistry><layoutList>").unwrap();

    let mut installer = Installer::new();
    let err = installer.install(&fx.request()).unwrap_err();

    assert!(matches!(err, InstallerError::RegistryParse { .. }));
    assert_eq!(installer.stage(), InstallStage::Mutating);
    // Completed steps stay in place, later ones never ran
    assert!(fx.xkb.join("symbols/us_split_v3").exists());
    assert!(fx.cache.join("server-0.xkm").exists());
}

// =============================================================================
// Dry run and cache-only mode
// =============================================================================

#[test]
fn test_dry_run_changes_nothing() {
    let fx = Fixture::new();
    let registry_before = fx.registry_text();

    let mut installer = Installer::new().dry_run(true);
    let outcome = installer.install(&fx.request()).unwrap();

    match outcome {
        InstallOutcome::Installed(report) => {
            assert!(report.dry_run);
            assert_eq!(report.layout_lists_updated, 1);
            assert_eq!(report.cache_removed, vec![fx.cache.join("server-0.xkm")]);
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert!(!fx.xkb.join("symbols/us_split_v3").exists());
    assert_eq!(fx.registry_text(), registry_before);
    assert!(fx.cache.join("server-0.xkm").exists());
}

#[test]
fn test_purge_cache_only() {
    let fx = Fixture::new();
    fs::write(fx.cache.join("a.xkm"), "").unwrap();
    fs::write(fx.cache.join("b.xkm"), "").unwrap();
    fs::write(fx.cache.join("c.txt"), "").unwrap();
    let registry_before = fx.registry_text();

    let removed = purge_cache_only(&fx.cache, false).unwrap();

    assert_eq!(
        removed,
        vec![
            fx.cache.join("a.xkm"),
            fx.cache.join("b.xkm"),
            fx.cache.join("server-0.xkm"),
        ]
    );
    assert!(fx.cache.join("c.txt").exists());
    assert!(fx.cache.join("README.txt").exists());
    // Nothing else is touched
    assert_eq!(fx.registry_text(), registry_before);
    assert!(!fx.xkb.join("symbols/us_split_v3").exists());

    // Second run finds nothing and still succeeds
    assert!(purge_cache_only(&fx.cache, false).unwrap().is_empty());
}

#[test]
fn test_purge_cache_only_dry_run() {
    let fx = Fixture::new();

    let listed = purge_cache_only(&fx.cache, true).unwrap();

    assert_eq!(listed, vec![fx.cache.join("server-0.xkm")]);
    assert!(fx.cache.join("server-0.xkm").exists());
}
