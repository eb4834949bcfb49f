//! Page modules for skiff.
//!
//! A page module is the loaded form of a compiled source file: a table of
//! named exports ([`Module`]). This crate defines the compiler and loader
//! seams ([`Compiler`], [`ModuleLoader`]), validates page modules into
//! [`Page`]s, scans source files for local dependencies and ships the
//! template compiler used by the CLI.

pub mod collection;
pub mod deps;
pub mod frontmatter;
pub mod module;
pub mod page;
pub mod template;
pub mod traits;

pub use deps::{local_dependencies, normalize_path};
pub use module::{Export, Module, PathLister, PropsGetter};
pub use page::{load_component, load_page, Page, PageError};
pub use template::{CompiledTemplate, TemplateCompiler, TemplateLoader};
pub use traits::{CompileError, Compiler, LoadError, ModuleLoader};
