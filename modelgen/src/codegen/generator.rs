//! Template rendering and file output

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{context, AutoEscape, Environment, UndefinedBehavior};
use tracing::{debug, info, warn};

use crate::config::{CodegenConfig, PackagesConfig};
use crate::error::{CodegenError, Result};
use crate::schema::Schema;

use super::naming::{
    escape_field_name, key_method_suffix, module_path, package_name, to_field_name,
    to_lower_camel, to_safe_identifier, to_upper_camel,
};
use super::plan::TablePlan;
use super::type_mapping::{param_type, strip_option, TypeMapper};

const ENTITY_TEMPLATE: &str = include_str!("../../templates/entity.rs.jinja");
const DTO_TEMPLATE: &str = include_str!("../../templates/dto.rs.jinja");
const DAO_TEMPLATE: &str = include_str!("../../templates/dao.rs.jinja");
const MODULE_INDEX_TEMPLATE: &str = include_str!("../../templates/mod.rs.jinja");

/// Built-in helper templates, sorted by name
const HELPER_TEMPLATES: &[(&str, &str)] = &[
    (
        "json.rs.jinja",
        include_str!("../../templates/helpers/json.rs.jinja"),
    ),
    (
        "pagination.rs.jinja",
        include_str!("../../templates/helpers/pagination.rs.jinja"),
    ),
    (
        "sort.rs.jinja",
        include_str!("../../templates/helpers/sort.rs.jinja"),
    ),
];

const HELPERS_DIR: &str = "helpers";
const TEMPLATE_SUFFIX: &str = ".jinja";

/// Kind of per-table artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Entity,
    TransferObject,
    DataAccessObject,
}

impl ArtifactKind {
    pub fn template_name(&self) -> &'static str {
        match self {
            ArtifactKind::Entity => "entity.rs.jinja",
            ArtifactKind::TransferObject => "dto.rs.jinja",
            ArtifactKind::DataAccessObject => "dao.rs.jinja",
        }
    }

    /// Appended to the table name to form the file name
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Entity => "",
            ArtifactKind::TransferObject => "_dto",
            ArtifactKind::DataAccessObject => "_dao",
        }
    }

    /// Output sub-path of this kind
    pub fn package<'a>(&self, packages: &'a PackagesConfig) -> &'a str {
        match self {
            ArtifactKind::Entity => &packages.entity,
            ArtifactKind::TransferObject => &packages.dto,
            ArtifactKind::DataAccessObject => &packages.dao,
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            ArtifactKind::Entity => ENTITY_TEMPLATE,
            ArtifactKind::TransferObject => DTO_TEMPLATE,
            ArtifactKind::DataAccessObject => DAO_TEMPLATE,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Entity => write!(f, "entity"),
            ArtifactKind::TransferObject => write!(f, "dto"),
            ArtifactKind::DataAccessObject => write!(f, "dao"),
        }
    }
}

/// Where template sources come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Templates compiled into the binary
    Embedded,
    /// A directory laid out like `templates/`; missing files fall back to
    /// the embedded copy
    Directory(PathBuf),
}

impl TemplateSource {
    fn load(&self, name: &str, embedded: &'static str) -> Result<Cow<'static, str>> {
        match self {
            TemplateSource::Embedded => Ok(Cow::Borrowed(embedded)),
            TemplateSource::Directory(dir) => {
                let path = dir.join(name);
                if path.is_file() {
                    let source =
                        fs::read_to_string(&path).map_err(|e| CodegenError::io(&path, e))?;
                    Ok(Cow::Owned(source))
                } else {
                    Ok(Cow::Borrowed(embedded))
                }
            }
        }
    }

    /// Helper templates as `(name, source)` in name order
    fn helpers(&self) -> Result<Vec<(String, Cow<'static, str>)>> {
        let dir = match self {
            TemplateSource::Directory(dir) if dir.join(HELPERS_DIR).is_dir() => {
                dir.join(HELPERS_DIR)
            }
            _ => {
                return Ok(HELPER_TEMPLATES
                    .iter()
                    .map(|(name, source)| (name.to_string(), Cow::Borrowed(*source)))
                    .collect())
            }
        };

        let entries = fs::read_dir(&dir).map_err(|e| CodegenError::io(&dir, e))?;
        let mut helpers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CodegenError::io(&dir, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !path.is_file() || !name.ends_with(TEMPLATE_SUFFIX) {
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|e| CodegenError::io(&path, e))?;
            helpers.push((name, Cow::Owned(source)));
        }
        helpers.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(helpers)
    }
}

/// Naming and type functions exposed to every template
#[derive(Clone)]
struct FunctionRegistry {
    mapper: Arc<TypeMapper>,
    entity_module: String,
    dto_module: String,
}

impl FunctionRegistry {
    fn install(&self, env: &mut Environment<'_>) {
        env.add_function("to_upper_camel", |s: &str| to_upper_camel(s));
        env.add_function("to_lower_camel", |s: &str| to_lower_camel(s));
        env.add_function("to_safe_identifier", |s: &str| to_safe_identifier(s));
        env.add_function("to_snake_case", |s: &str| to_field_name(s));
        env.add_function("to_safe_field_name", |s: &str| escape_field_name(s));
        env.add_function("key_suffix", |columns: Vec<String>| {
            key_method_suffix(&columns)
        });
        env.add_function("strip_option", |ty: &str| strip_option(ty));
        env.add_function("param_type", |ty: &str| param_type(ty));

        let mapper = Arc::clone(&self.mapper);
        env.add_function("map_type", move |raw: &str, nullable: bool| {
            mapper.map_type(raw, nullable)
        });

        let entity_module = self.entity_module.clone();
        env.add_function("entity_path", move |table: &str| {
            format!("{}::{}", entity_module, to_upper_camel(table))
        });
        let dto_module = self.dto_module.clone();
        env.add_function("dto_path", move |table: &str| {
            format!("{}::{}", dto_module, to_upper_camel(table))
        });

        env.add_filter("one_line", |s: &str| {
            s.split_whitespace().collect::<Vec<_>>().join(" ")
        });
    }
}

/// Renders templates over schemas and writes the results
pub struct Generator {
    output_path: PathBuf,
    module_root: String,
    packages: PackagesConfig,
    templates: TemplateSource,
    registry: FunctionRegistry,
    dry_run: bool,
}

impl Generator {
    pub fn new(config: &CodegenConfig) -> Self {
        let templates = match &config.template_dir {
            Some(dir) => TemplateSource::Directory(dir.clone()),
            None => TemplateSource::Embedded,
        };
        let module_root = if config.module_root.trim().is_empty() {
            "crate".to_string()
        } else {
            config.module_root.trim().to_string()
        };
        let registry = FunctionRegistry {
            mapper: Arc::new(TypeMapper::rust()),
            entity_module: join_module(&module_root, &config.packages.entity),
            dto_module: join_module(&module_root, &config.packages.dto),
        };

        Self {
            output_path: config.output_path.clone(),
            module_root,
            packages: config.packages.clone(),
            templates,
            registry,
            dry_run: config.dry_run,
        }
    }

    /// Replace the type mapping rules used by `map_type`
    pub fn with_type_mapper(mut self, mapper: TypeMapper) -> Self {
        self.registry.mapper = Arc::new(mapper);
        self
    }

    /// Output directory of an artifact kind
    pub fn artifact_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.output_path.join(kind.package(&self.packages))
    }

    /// Render one file per schema, named `<table><suffix>.rs`.
    ///
    /// Returns the paths of the files written, one per schema.
    pub fn generate_one_by_one(
        &self,
        kind: ArtifactKind,
        schemas: &[Schema],
    ) -> Result<Vec<PathBuf>> {
        let dir = self.artifact_dir(kind);
        let package = package_name(kind.package(&self.packages));
        let mut written = Vec::with_capacity(schemas.len());

        for schema in schemas {
            let file_name = format!("{}{}.rs", to_field_name(&schema.name), kind.file_suffix());
            debug!("Generating {} for {} -> {}", kind, schema.name, file_name);
            let code = self.render_kind(kind, &package, std::slice::from_ref(schema))?;
            let path = dir.join(file_name);
            self.write(&path, &code)?;
            written.push(path);
        }

        Ok(written)
    }

    /// Render all schemas into a single file
    pub fn generate_all(
        &self,
        kind: ArtifactKind,
        schemas: &[Schema],
        file_name: &str,
    ) -> Result<PathBuf> {
        let dir = self.artifact_dir(kind);
        let package = package_name(kind.package(&self.packages));
        debug!("Generating {} for {} tables -> {}", kind, schemas.len(), file_name);
        let code = self.render_kind(kind, &package, schemas)?;
        let path = dir.join(file_name);
        self.write(&path, &code)?;
        Ok(path)
    }

    /// Render every helper template; `<name>.rs.jinja` becomes `<name>.rs`
    pub fn generate_helpers(&self) -> Result<Vec<PathBuf>> {
        let dir = self.output_path.join(&self.packages.helper);
        let package = package_name(&self.packages.helper);
        let mut written = Vec::new();

        for (name, source) in self.templates.helpers()? {
            let file_name = name.trim_end_matches(TEMPLATE_SUFFIX);
            debug!("Generating helper {}", file_name);
            let code = self.render(&name, &source, &package, &[])?;
            let path = dir.join(file_name);
            self.write(&path, &code)?;
            written.push(path);
        }

        Ok(written)
    }

    /// Write a `mod.rs` in `dir` declaring and re-exporting each generated file
    pub fn generate_module_index(&self, dir: &Path, files: &[PathBuf]) -> Result<PathBuf> {
        let mut modules: Vec<String> = files
            .iter()
            .filter_map(|f| f.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| s != "mod")
            .collect();
        modules.sort();
        modules.dedup();

        let name = "mod.rs.jinja";
        let source = self.templates.load(name, MODULE_INDEX_TEMPLATE)?;
        let mut env = self.environment();
        env.add_template(name, &source)
            .map_err(|e| CodegenError::template(name, e))?;
        let code = env
            .get_template(name)
            .and_then(|t| t.render(context! { modules => modules }))
            .map_err(|e| CodegenError::template(name, e))?;

        let path = dir.join("mod.rs");
        self.write(&path, &code)?;
        Ok(path)
    }

    fn render_kind(&self, kind: ArtifactKind, package: &str, schemas: &[Schema]) -> Result<String> {
        let name = kind.template_name();
        let source = self.templates.load(name, kind.embedded())?;
        self.render(name, &source, package, schemas)
    }

    fn render(&self, name: &str, source: &str, package: &str, schemas: &[Schema]) -> Result<String> {
        let plans: BTreeMap<&str, TablePlan> = schemas
            .iter()
            .map(|s| (s.name.as_str(), TablePlan::new(s)))
            .collect();

        let mut env = self.environment();
        env.add_template(name, source)
            .map_err(|e| CodegenError::template(name, e))?;
        let template = env
            .get_template(name)
            .map_err(|e| CodegenError::template(name, e))?;

        template
            .render(context! {
                package => package,
                schemas => schemas,
                plans => plans,
                module_root => &self.module_root,
                helper_module => join_module(&self.module_root, &self.packages.helper),
            })
            .map_err(|e| CodegenError::template(name, e))
    }

    fn environment<'s>(&self) -> Environment<'s> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        self.registry.install(&mut env);
        env
    }

    fn write(&self, path: &Path, code: &str) -> Result<()> {
        let code = match format_source(code) {
            Ok(formatted) => formatted,
            Err(e) => {
                warn!(
                    "Generated code for {} does not parse, writing it unformatted: {}",
                    path.display(),
                    e
                );
                code.to_string()
            }
        };

        if self.dry_run {
            info!("[dry run] would write {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CodegenError::io(parent, e))?;
        }
        fs::write(path, code).map_err(|e| CodegenError::io(path, e))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Pretty-print Rust source; fails when it does not parse
pub fn format_source(code: &str) -> std::result::Result<String, syn::Error> {
    let file = syn::parse_file(code)?;
    Ok(prettyplease::unparse(&file))
}

fn join_module(root: &str, sub_path: &str) -> String {
    let sub = module_path(sub_path);
    if sub.is_empty() {
        root.to_string()
    } else {
        format!("{}::{}", root, sub)
    }
}
