//! Per-package declaration index.
//!
//! A [`PackageIndex`] records what a call site may resolve to: functions,
//! methods keyed by receiver type, type declarations (for field and
//! embedding lookups) and package-level variables (for receiver types).

use std::collections::HashMap;

use tree_sitter::Node;

use crate::syntax::{field_children, named_children, text, unquote, ParsedFile};
use crate::types::{type_param_names, FuncSig, GoType, TypeContext};

/// Import table of one file.
#[derive(Debug, Clone, Default)]
pub struct FileImports {
    aliases: HashMap<String, String>,
    dot: Vec<String>,
}

impl FileImports {
    /// Collects the imports declared in `file`.
    #[must_use]
    pub fn from_file(file: &ParsedFile) -> Self {
        let src = file.src();
        let mut imports = Self::default();
        for decl in named_children(file.root()) {
            if decl.kind() != "import_declaration" {
                continue;
            }
            for child in named_children(decl) {
                match child.kind() {
                    "import_spec" => imports.add_spec(child, src),
                    "import_spec_list" => {
                        for spec in named_children(child) {
                            if spec.kind() == "import_spec" {
                                imports.add_spec(spec, src);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        imports
    }

    fn add_spec(&mut self, spec: Node<'_>, src: &[u8]) {
        let Some(path) = spec.child_by_field_name("path") else {
            return;
        };
        let path = unquote(text(path, src)).to_owned();
        match spec.child_by_field_name("name") {
            Some(name) if name.kind() == "dot" => self.dot.push(path),
            Some(name) if name.kind() == "blank_identifier" => {}
            Some(name) => {
                self.aliases.insert(text(name, src).to_owned(), path);
            }
            None => {
                self.aliases.insert(default_package_name(&path), path);
            }
        }
    }

    /// Import path bound to a local package name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Import paths imported with `.`.
    #[must_use]
    pub fn dot_imports(&self) -> &[String] {
        &self.dot
    }
}

/// Local name an unaliased import is conventionally known by.
///
/// `gopkg.in/yaml.v2` is `yaml`, `github.com/x/y/v3` is `y` and
/// `github.com/mattn/go-sqlite3` is `sqlite3`.
#[must_use]
pub fn default_package_name(import_path: &str) -> String {
    let mut segments = import_path.rsplit('/');
    let mut last = segments.next().unwrap_or(import_path);
    let is_major = |s: &str| {
        s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit())
    };
    if is_major(last) {
        if let Some(prev) = segments.next() {
            last = prev;
        }
    }
    if let Some((stem, suffix)) = last.rsplit_once('.') {
        if is_major(suffix) {
            last = stem;
        }
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    last.replace(['-', '.'], "_")
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    /// Type parameter names of a generic receiver (`T` in `List[T]`).
    pub receiver_params: Vec<String>,
    /// Parameter and result types.
    pub sig: FuncSig,
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name; the type name for embedded fields.
    pub name: String,
    /// Declared type.
    pub ty: GoType,
    /// Whether the field is embedded.
    pub embedded: bool,
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDecl {
    /// `type T struct { ... }`
    Struct(Vec<Field>),
    /// `type T interface { ... }`
    Interface,
    /// `type T = U`
    Alias(GoType),
    /// `type T U` for any other `U`.
    Defined(GoType),
}

/// Declarations of one package.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    path: String,
    name: String,
    funcs: HashMap<String, FuncSig>,
    methods: HashMap<String, HashMap<String, MethodDecl>>,
    types: HashMap<String, TypeDecl>,
    vars: HashMap<String, Option<GoType>>,
}

impl PackageIndex {
    /// Indexes `files`, all belonging to the package with import path `path`.
    #[must_use]
    pub fn build(path: &str, files: &[ParsedFile]) -> Self {
        let name = files
            .iter()
            .find_map(ParsedFile::package_name)
            .unwrap_or_default()
            .to_owned();
        let mut index = Self {
            path: path.to_owned(),
            name,
            ..Self::default()
        };

        let imports: Vec<FileImports> = files.iter().map(FileImports::from_file).collect();
        for (file, imports) in files.iter().zip(&imports) {
            let ctx = TypeContext::new(path, imports, file.src());
            for decl in named_children(file.root()) {
                match decl.kind() {
                    "function_declaration" => index.add_func(&ctx, decl),
                    "method_declaration" => index.add_method(&ctx, decl),
                    "type_declaration" => index.add_types(&ctx, decl),
                    _ => {}
                }
            }
        }

        // Variable initializers may call functions of this package.
        for (file, imports) in files.iter().zip(&imports) {
            let ctx = TypeContext::new(path, imports, file.src());
            for decl in named_children(file.root()) {
                if decl.kind() == "var_declaration" {
                    for spec in var_specs(decl) {
                        index.add_vars(&ctx, spec);
                    }
                }
            }
        }

        tracing::debug!(
            package = %index.path,
            funcs = index.funcs.len(),
            types = index.types.len(),
            "indexed package"
        );
        index
    }

    /// Import path of the package.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Package clause name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signature of a package-level function.
    #[must_use]
    pub fn func(&self, name: &str) -> Option<&FuncSig> {
        self.funcs.get(name)
    }

    /// Method `name` declared on receiver base type `ty`.
    #[must_use]
    pub fn method(&self, ty: &str, name: &str) -> Option<&MethodDecl> {
        self.methods.get(ty)?.get(name)
    }

    /// Type declaration by name.
    #[must_use]
    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    /// Returns true if `name` is a package-level variable.
    #[must_use]
    pub fn has_var(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Declared or inferred type of a package-level variable.
    #[must_use]
    pub fn var_type(&self, name: &str) -> Option<&GoType> {
        self.vars.get(name)?.as_ref()
    }

    /// Canonical signature of function `name`.
    #[must_use]
    pub fn func_signature(&self, name: &str, sig: &FuncSig) -> String {
        format!("func {}.{name}{sig}", self.path)
    }

    /// Canonical signature of method `name` on `ty`, called through a
    /// pointer when `pointer` is set.
    #[must_use]
    pub fn method_signature(&self, ty: &str, name: &str, pointer: bool, decl: &MethodDecl) -> String {
        let star = if pointer { "*" } else { "" };
        let params = if decl.receiver_params.is_empty() {
            String::new()
        } else {
            format!("[{}]", decl.receiver_params.join(", "))
        };
        format!("func ({star}{}.{ty}{params}).{name}{}", self.path, decl.sig)
    }

    fn add_func(&mut self, ctx: &TypeContext<'_>, decl: Node<'_>) {
        let Some(name) = decl.child_by_field_name("name") else {
            return;
        };
        let ctx = ctx.with_type_params(type_param_names(
            decl.child_by_field_name("type_parameters"),
            ctx.src,
        ));
        let sig = ctx.signature(
            decl.child_by_field_name("parameters"),
            decl.child_by_field_name("result"),
        );
        self.funcs.insert(text(name, ctx.src).to_owned(), sig);
    }

    fn add_method(&mut self, ctx: &TypeContext<'_>, decl: Node<'_>) {
        let (Some(name), Some(receiver)) = (
            decl.child_by_field_name("name"),
            decl.child_by_field_name("receiver"),
        ) else {
            return;
        };
        let Some((base, receiver_params)) = receiver_type(receiver, ctx.src) else {
            return;
        };
        let ctx = ctx.with_type_params(receiver_params.iter().cloned());
        let sig = ctx.signature(
            decl.child_by_field_name("parameters"),
            decl.child_by_field_name("result"),
        );
        self.methods.entry(base).or_default().insert(
            text(name, ctx.src).to_owned(),
            MethodDecl {
                receiver_params,
                sig,
            },
        );
    }

    fn add_types(&mut self, ctx: &TypeContext<'_>, decl: Node<'_>) {
        for spec in named_children(decl) {
            let (Some(name), Some(ty)) = (
                spec.child_by_field_name("name"),
                spec.child_by_field_name("type"),
            ) else {
                continue;
            };
            let name = text(name, ctx.src).to_owned();
            let ctx = ctx.with_type_params(type_param_names(
                spec.child_by_field_name("type_parameters"),
                ctx.src,
            ));
            let decl = match (spec.kind(), ty.kind()) {
                ("type_alias", _) => TypeDecl::Alias(ctx.resolve(ty)),
                (_, "struct_type") => TypeDecl::Struct(struct_fields(&ctx, ty)),
                (_, "interface_type") => TypeDecl::Interface,
                _ => TypeDecl::Defined(ctx.resolve(ty)),
            };
            self.types.insert(name, decl);
        }
    }

    fn add_vars(&mut self, ctx: &TypeContext<'_>, spec: Node<'_>) {
        let names = field_children(spec, "name");
        let declared = spec.child_by_field_name("type").map(|t| ctx.resolve(t));
        let values = spec
            .child_by_field_name("value")
            .map(named_children)
            .unwrap_or_default();
        for (i, name) in names.into_iter().enumerate() {
            let ty = declared.clone().or_else(|| {
                values
                    .get(i)
                    .and_then(|v| self.initializer_type(ctx, *v))
            });
            self.vars.insert(text(name, ctx.src).to_owned(), ty);
        }
    }

    /// Type of a package-level initializer, for the forms that need no
    /// other package.
    fn initializer_type(&self, ctx: &TypeContext<'_>, expr: Node<'_>) -> Option<GoType> {
        match expr.kind() {
            "composite_literal" => expr.child_by_field_name("type").map(|t| ctx.resolve(t)),
            "unary_expression" => {
                let op = expr.child_by_field_name("operator")?;
                let operand = expr.child_by_field_name("operand")?;
                (text(op, ctx.src) == "&")
                    .then(|| self.initializer_type(ctx, operand))
                    .flatten()
                    .map(|t| GoType::Pointer(Box::new(t)))
            }
            "call_expression" => {
                let callee = expr.child_by_field_name("function")?;
                if callee.kind() != "identifier" {
                    return None;
                }
                let name = text(callee, ctx.src);
                if name == "new" {
                    let arg = named_children(expr.child_by_field_name("arguments")?)
                        .into_iter()
                        .next()?;
                    return Some(GoType::Pointer(Box::new(ctx.resolve(arg))));
                }
                self.funcs.get(name)?.results.first().cloned()
            }
            "interpreted_string_literal" | "raw_string_literal" => Some(GoType::builtin("string")),
            _ => None,
        }
    }
}

fn var_specs(decl: Node<'_>) -> Vec<Node<'_>> {
    let mut specs = Vec::new();
    for child in named_children(decl) {
        match child.kind() {
            "var_spec" => specs.push(child),
            "var_spec_list" => specs.extend(
                named_children(child)
                    .into_iter()
                    .filter(|n| n.kind() == "var_spec"),
            ),
            _ => {}
        }
    }
    specs
}

/// Base type name and generic parameter names of a method receiver.
fn receiver_type(receiver: Node<'_>, src: &[u8]) -> Option<(String, Vec<String>)> {
    let param = named_children(receiver)
        .into_iter()
        .find(|n| n.kind() == "parameter_declaration")?;
    let mut ty = param.child_by_field_name("type")?;
    while matches!(ty.kind(), "pointer_type" | "parenthesized_type") {
        ty = ty.named_child(0)?;
    }
    match ty.kind() {
        "type_identifier" => Some((text(ty, src).to_owned(), Vec::new())),
        "generic_type" => {
            let base = text(ty.child_by_field_name("type")?, src).to_owned();
            let params = ty
                .child_by_field_name("type_arguments")
                .map(|args| {
                    named_children(args)
                        .into_iter()
                        .map(|a| text(a, src).trim().to_owned())
                        .collect()
                })
                .unwrap_or_default();
            Some((base, params))
        }
        _ => None,
    }
}

fn struct_fields(ctx: &TypeContext<'_>, ty: Node<'_>) -> Vec<Field> {
    let Some(list) = named_children(ty)
        .into_iter()
        .find(|n| n.kind() == "field_declaration_list")
    else {
        return Vec::new();
    };
    let mut fields = Vec::new();
    for decl in named_children(list) {
        if decl.kind() != "field_declaration" {
            continue;
        }
        let Some(type_node) = decl.child_by_field_name("type") else {
            continue;
        };
        let names = field_children(decl, "name");
        let field_ty = ctx.resolve(type_node);
        if names.is_empty() {
            let mut cursor = decl.walk();
            let pointer = decl.children(&mut cursor).any(|c| c.kind() == "*");
            let name = match &field_ty {
                GoType::Named { name, .. } => name.clone(),
                _ => continue,
            };
            let ty = if pointer {
                GoType::Pointer(Box::new(field_ty))
            } else {
                field_ty
            };
            fields.push(Field {
                name,
                ty,
                embedded: true,
            });
        } else {
            for name in names {
                fields.push(Field {
                    name: text(name, ctx.src).to_owned(),
                    ty: field_ty.clone(),
                    embedded: false,
                });
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GoParser;

    fn index(path: &str, src: &str) -> PackageIndex {
        let file = GoParser::new().parse(src.to_owned()).expect("parser runs");
        PackageIndex::build(path, &[file])
    }

    #[test]
    fn default_names_follow_go_conventions() {
        assert_eq!(default_package_name("os"), "os");
        assert_eq!(default_package_name("net/http"), "http");
        assert_eq!(default_package_name("gopkg.in/yaml.v2"), "yaml");
        assert_eq!(default_package_name("github.com/x/y/v3"), "y");
        assert_eq!(default_package_name("github.com/mattn/go-sqlite3"), "sqlite3");
    }

    #[test]
    fn indexes_functions_with_qualified_types() {
        let idx = index(
            "example.com/app",
            r#"package app

import (
	"io"
	nethttp "net/http"
)

func Fetch(c *nethttp.Client, a, b string, rest ...io.Reader) (*nethttp.Response, error) {
	return nil, nil
}
"#,
        );
        let sig = idx.func("Fetch").expect("indexed");
        assert_eq!(
            idx.func_signature("Fetch", sig),
            "func example.com/app.Fetch(*net/http.Client, string, string, ...io.Reader) (*net/http.Response, error)"
        );
        assert_eq!(idx.name(), "app");
    }

    #[test]
    fn indexes_methods_by_receiver_base() {
        let idx = index(
            "example.com/list",
            "package list\n\ntype List[T any] struct { items []T }\n\nfunc (l *List[T]) Push(v T) {}\n\nfunc (l List[T]) Len() int { return 0 }\n",
        );
        let push = idx.method("List", "Push").expect("indexed");
        assert_eq!(push.receiver_params, vec!["T".to_owned()]);
        assert_eq!(
            idx.method_signature("List", "Push", true, push),
            "func (*example.com/list.List[T]).Push(T)"
        );
        let len = idx.method("List", "Len").expect("indexed");
        assert_eq!(
            idx.method_signature("List", "Len", false, len),
            "func (example.com/list.List[T]).Len() int"
        );
    }

    #[test]
    fn records_struct_fields_and_embedding() {
        let idx = index(
            "example.com/app",
            "package app\n\nimport \"net/http\"\n\ntype Server struct {\n\t*http.Client\n\tname, addr string\n}\n",
        );
        let Some(TypeDecl::Struct(fields)) = idx.type_decl("Server") else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 3);
        assert!(fields[0].embedded);
        assert_eq!(fields[0].name, "Client");
        assert_eq!(fields[0].ty.to_string(), "*net/http.Client");
        assert_eq!(fields[2].name, "addr");
    }

    #[test]
    fn infers_package_variable_types() {
        let idx = index(
            "example.com/app",
            "package app\n\ntype T struct{}\n\nfunc NewT() *T { return nil }\n\nvar (\n\ta = &T{}\n\tb T\n\tc = NewT()\n\td = compute\n)\n",
        );
        assert_eq!(idx.var_type("a").map(ToString::to_string).as_deref(), Some("*example.com/app.T"));
        assert_eq!(idx.var_type("b").map(ToString::to_string).as_deref(), Some("example.com/app.T"));
        assert_eq!(idx.var_type("c").map(ToString::to_string).as_deref(), Some("*example.com/app.T"));
        assert!(idx.has_var("d"));
        assert_eq!(idx.var_type("d"), None);
    }
}
