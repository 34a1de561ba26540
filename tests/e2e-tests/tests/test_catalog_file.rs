//! Test Scenario 3: Catalog Round Trip
//!
//! A YAML catalog on disk declares the modules; the registry resolves and
//! creates services from it, loading modules on demand.

use std::io::Write;
use std::sync::Arc;

use e2e_tests::assertions::{assert_built_by, assert_not_started, assert_started_once};
use e2e_tests::{PluginModule, RecordingWorker};
use hsu_common::{FactoryError, MatchTier, ModuleID};
use hsu_service_factory::{ModuleHandle, ServiceCatalog, ServiceRegistry};

const CATALOG: &str = r#"
modules:
  - id: io_vtk
    services:
      - implementation: Writer.VTK
        service_type: IWriter
        objects: [Object]
        description: Generic VTK writer
      - implementation: Writer.VTKImage
        service_type: IWriter
        objects: [Image]
  - id: io_stl
    services:
      - implementation: Writer.STL
        service_type: IWriter
        objects: [Mesh]
        tags: io,stl
      - implementation: Writer.PLY
        service_type: IWriter
        objects: [Mesh]
  - id: io_legacy
    enabled: false
    services:
      - implementation: Writer.Legacy
        service_type: IWriter
        objects: [Object]
"#;

fn load_catalog() -> ServiceCatalog {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CATALOG.as_bytes()).unwrap();
    ServiceCatalog::load_from_file(file.path()).unwrap()
}

fn find<'a>(modules: &'a [Arc<PluginModule>], id: &str) -> &'a Arc<PluginModule> {
    modules.iter().find(|m| m.id().as_str() == id).unwrap()
}

#[test]
fn test_catalog_round_trip() {
    let catalog = load_catalog();
    assert_eq!(catalog.enabled_modules().len(), 2);
    assert_eq!(catalog.service_count(), 4);

    let modules: Vec<Arc<PluginModule>> = catalog
        .enabled_modules()
        .into_iter()
        .map(PluginModule::from_declaration)
        .collect();
    let descriptors = catalog
        .module_descriptors(|id| {
            modules
                .iter()
                .find(|m| m.id() == id)
                .map(|m| Arc::clone(m) as Arc<dyn ModuleHandle>)
        })
        .unwrap();

    let registry = ServiceRegistry::new(RecordingWorker::new("catalog"));
    registry.parse_module_descriptors(&descriptors);
    drop(descriptors);

    // Metadata comes straight from the catalog
    assert_eq!(registry.count(), 4);
    assert!(!registry.has_implementation("Writer.Legacy"));
    assert_eq!(registry.get_service_description("Writer.VTK"), "Generic VTK writer");
    assert_eq!(registry.get_service_tags("Writer.STL"), "io,stl");
    assert_eq!(registry.module_of("Writer.STL"), Some(ModuleID::from("io_stl")));

    // Image has one specific writer
    let implementation = registry.get_default_implementation_for("Image", "IWriter");
    let handle = registry.create(implementation).unwrap();
    assert_built_by(&handle, "Writer.VTKImage", "catalog").unwrap();
    assert_started_once(find(&modules, "io_vtk")).unwrap();
    assert_not_started(find(&modules, "io_stl")).unwrap();

    // Mesh has two specific writers: ambiguous even though a generic one exists
    match registry.resolve_default_implementation("Mesh", "IWriter") {
        Err(FactoryError::AmbiguousImplementation { tier, candidates, .. }) => {
            assert_eq!(tier, MatchTier::Specific);
            let names: Vec<_> = candidates.iter().map(|c| c.as_str()).collect();
            assert_eq!(names, vec!["Writer.PLY", "Writer.STL"]);
        }
        other => panic!("Expected specific ambiguity, got {:?}", other),
    }

    // Unknown object types fall back to the generic writer
    assert_eq!(
        registry.get_default_implementation_for("PointCloud", "IWriter").as_str(),
        "Writer.VTK"
    );
    assert!(!registry.support("PointCloud", "IReader"));
}

#[test]
fn test_catalog_with_unknown_module() {
    let catalog = load_catalog();
    let err = catalog
        .module_descriptors(|id| {
            (id.as_str() == "io_vtk").then(|| {
                PluginModule::new("io_vtk").build() as Arc<dyn ModuleHandle>
            })
        })
        .unwrap_err();
    assert!(err.to_string().contains("io_stl"));
}
