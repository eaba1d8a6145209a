//! Call-site scanning.
//!
//! [`SourceScanner`] walks every Go file of the target packages and resolves
//! the canonical signature of each direct call expression. Resolution is
//! syntactic plus a small amount of static type inference: enough to know
//! the receiver type of a method call in the common cases, never a full
//! type checker. Calls that cannot be resolved produce nothing.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tree_sitter::Node;

use crate::index::{FileImports, PackageIndex, TypeDecl};
use crate::loader::{expand_targets, go_files, is_std_import, Exclusions, PackageSource};
use crate::syntax::{field_children, named_children, position, text, GoParser, ParsedFile, SyntaxError};
use crate::types::{type_param_names, FuncSig, GoType, TypeContext, BUILTIN_TYPES};

/// Depth limit for embedded-field promotion.
const MAX_EMBED_DEPTH: usize = 4;

/// A resolved call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Line of the callee token (1-indexed).
    pub line: usize,
    /// Column of the callee token (1-indexed, bytes).
    pub column: usize,
    /// Canonical signature of the invoked function or method.
    pub signature: String,
}

/// Why a file produced no call sites.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The file could not be read.
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    /// The file is not valid Go.
    #[error("failed to parse file: {}", .0.message)]
    Parse(SyntaxError),
}

impl ScanError {
    /// Position the error is reported at.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        match self {
            Self::Read(_) => (1, 1),
            Self::Parse(err) => (err.line, err.column),
        }
    }
}

/// Scan result of one file.
#[derive(Debug)]
pub struct FileScan {
    /// Path of the file.
    pub path: PathBuf,
    /// Call sites ordered by position, or the reason the file was skipped.
    pub outcome: Result<Vec<CallSite>, ScanError>,
}

/// Scans packages for call sites.
pub struct SourceScanner {
    source: Box<dyn PackageSource>,
    parser: GoParser,
    exclusions: Exclusions,
    cache: RefCell<HashMap<String, Option<Rc<PackageIndex>>>>,
    missing_std: Cell<bool>,
}

impl SourceScanner {
    /// Creates a scanner resolving imports through `source`.
    #[must_use]
    pub fn new(source: Box<dyn PackageSource>) -> Self {
        Self {
            source,
            parser: GoParser::new(),
            exclusions: Exclusions::default(),
            cache: RefCell::new(HashMap::new()),
            missing_std: Cell::new(false),
        }
    }

    /// Replaces the rules used when expanding `...` targets.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Scans the packages named by `targets`, relative to `base`, passing
    /// each file's result to `visit` as soon as it is available.
    ///
    /// Files are visited package by package in target order, and in lexical
    /// path order within a package.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `visit`.
    pub fn scan<E>(
        &self,
        base: &Path,
        targets: &[String],
        mut visit: impl FnMut(FileScan) -> Result<(), E>,
    ) -> Result<(), E> {
        for dir in expand_targets(base, targets, &self.exclusions) {
            self.scan_package(&dir, &mut visit)?;
        }
        Ok(())
    }

    fn scan_package<E>(
        &self,
        dir: &Path,
        visit: &mut impl FnMut(FileScan) -> Result<(), E>,
    ) -> Result<(), E> {
        let files = match go_files(dir) {
            Ok(files) => files,
            Err(err) => {
                tracing::debug!(dir = %dir.display(), error = %err, "cannot list package");
                return Ok(());
            }
        };
        if files.is_empty() {
            tracing::debug!(dir = %dir.display(), "no Go files");
            return Ok(());
        }

        // Only clean files contribute declarations; outcomes point into `clean`.
        let mut clean: Vec<ParsedFile> = Vec::new();
        let mut outcomes: Vec<(PathBuf, Result<usize, ScanError>)> = Vec::new();
        for path in files {
            match self.read_and_parse(&path) {
                Ok(file) => {
                    outcomes.push((path, Ok(clean.len())));
                    clean.push(file);
                }
                Err(err) => outcomes.push((path, Err(err))),
            }
        }

        let import_path = self
            .source
            .import_path_of(dir)
            .or_else(|| clean.iter().find_map(|f| f.package_name().map(str::to_owned)))
            .unwrap_or_else(|| {
                dir.file_name()
                    .map_or_else(|| "main".to_owned(), |n| n.to_string_lossy().into_owned())
            });
        tracing::debug!(package = %import_path, dir = %dir.display(), "scanning package");

        let index = Rc::new(PackageIndex::build(&import_path, &clean));
        self.cache
            .borrow_mut()
            .insert(import_path.clone(), Some(Rc::clone(&index)));

        for (path, outcome) in outcomes {
            let outcome = outcome.map(|i| {
                let file = &clean[i];
                let imports = FileImports::from_file(file);
                let mut walker = FileWalker::new(self, &index, &imports, file.src());
                walker.walk(file.root());
                walker.finish()
            });
            visit(FileScan { path, outcome })?;
        }
        Ok(())
    }

    fn read_and_parse(&self, path: &Path) -> Result<ParsedFile, ScanError> {
        let source = std::fs::read_to_string(path)?;
        let file = self.parser.parse(source).map_err(ScanError::Parse)?;
        match file.syntax_error() {
            Some(err) => Err(ScanError::Parse(err)),
            None => Ok(file),
        }
    }

    /// Loads and indexes an imported package, caching the result.
    fn load(&self, import_path: &str) -> Option<Rc<PackageIndex>> {
        if let Some(cached) = self.cache.borrow().get(import_path) {
            return cached.clone();
        }
        let index = self.load_uncached(import_path).map(Rc::new);
        if index.is_none() {
            if is_std_import(import_path) && !self.missing_std.replace(true) {
                tracing::warn!(
                    import = %import_path,
                    "standard library package not found; set GOROOT or put `go` on PATH, \
                     calls into the standard library cannot be checked"
                );
            } else {
                tracing::debug!(import = %import_path, "import not resolvable");
            }
        }
        self.cache
            .borrow_mut()
            .insert(import_path.to_owned(), index.clone());
        index
    }

    fn load_uncached(&self, import_path: &str) -> Option<PackageIndex> {
        let dir = self.source.locate(import_path)?;
        let files = go_files(&dir).ok()?;
        let parsed: Vec<ParsedFile> = files
            .iter()
            .filter_map(|path| std::fs::read_to_string(path).ok())
            .filter_map(|src| self.parser.parse(src).ok())
            .collect();
        if parsed.is_empty() {
            return None;
        }
        Some(PackageIndex::build(import_path, &parsed))
    }
}

/// Resolved callee of a call expression.
struct Callee {
    signature: String,
    sig: FuncSig,
}

/// Walks one file, tracking local bindings and collecting call sites.
struct FileWalker<'a> {
    scanner: &'a SourceScanner,
    pkg: &'a PackageIndex,
    imports: &'a FileImports,
    src: &'a [u8],
    scopes: Vec<HashMap<String, Option<GoType>>>,
    type_params: Vec<String>,
    calls: Vec<CallSite>,
}

impl<'a> FileWalker<'a> {
    fn new(
        scanner: &'a SourceScanner,
        pkg: &'a PackageIndex,
        imports: &'a FileImports,
        src: &'a [u8],
    ) -> Self {
        Self {
            scanner,
            pkg,
            imports,
            src,
            scopes: Vec::new(),
            type_params: Vec::new(),
            calls: Vec::new(),
        }
    }

    fn finish(mut self) -> Vec<CallSite> {
        self.calls.sort_by_key(|c| (c.line, c.column));
        self.calls
    }

    fn ctx(&self) -> TypeContext<'a> {
        TypeContext::new(self.pkg.path(), self.imports, self.src)
            .with_type_params(self.type_params.iter().cloned())
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        text(node, self.src)
    }

    // Scopes

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str, ty: Option<GoType>) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), ty);
        }
    }

    /// `Some(type)` if `name` is a local binding, where `type` may be
    /// unknown.
    fn local(&self, name: &str) -> Option<Option<&GoType>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(Option::as_ref)
    }

    fn is_local(&self, name: &str) -> bool {
        self.local(name).is_some()
    }

    fn bind_parameters(&mut self, list: Option<Node<'_>>) {
        let Some(list) = list else {
            return;
        };
        if list.kind() != "parameter_list" {
            return;
        }
        let params = self.ctx().parameters(list);
        for (name, ty, variadic) in params {
            let Some(name) = name else {
                continue;
            };
            let ty = if variadic {
                GoType::Slice(Box::new(ty))
            } else {
                ty
            };
            self.bind(&name, Some(ty));
        }
    }

    // Traversal

    fn walk(&mut self, node: Node<'_>) {
        match node.kind() {
            "function_declaration" => {
                self.type_params =
                    type_param_names(node.child_by_field_name("type_parameters"), self.src);
                self.walk_function(node, None);
                self.type_params.clear();
            }
            "method_declaration" => {
                self.type_params = receiver_type_params(node, self.src);
                self.walk_function(node, node.child_by_field_name("receiver"));
                self.type_params.clear();
            }
            "func_literal" => self.walk_function(node, None),
            "block" | "if_statement" | "for_statement" | "expression_switch_statement"
            | "select_statement" | "communication_case" | "expression_case"
            | "default_case" => {
                self.push_scope();
                self.walk_children(node);
                self.pop_scope();
            }
            "type_switch_statement" => self.walk_type_switch(node),
            "short_var_declaration" => self.walk_short_var(node),
            "var_declaration" | "const_declaration" => self.walk_local_decl(node),
            "range_clause" => self.walk_range(node),
            "call_expression" => {
                self.record_call(node);
                self.walk_children(node);
            }
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.walk(child);
        }
    }

    fn walk_function(&mut self, node: Node<'_>, receiver: Option<Node<'_>>) {
        self.push_scope();
        self.bind_parameters(receiver);
        self.bind_parameters(node.child_by_field_name("parameters"));
        self.bind_parameters(node.child_by_field_name("result"));
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body);
        }
        self.pop_scope();
    }

    /// The alias of `switch x := v.(type)` takes the case type when the
    /// case lists exactly one type, and is unknown otherwise.
    fn walk_type_switch(&mut self, node: Node<'_>) {
        let alias = field_children(node, "alias")
            .into_iter()
            .flat_map(|a| match a.kind() {
                "expression_list" => named_children(a),
                _ => vec![a],
            })
            .next()
            .map(|a| self.text(a));

        self.push_scope();
        for field in ["initializer", "value"] {
            if let Some(part) = node.child_by_field_name(field) {
                self.walk(part);
            }
        }
        for clause in named_children(node) {
            match clause.kind() {
                "type_case" | "default_case" => {
                    self.push_scope();
                    if let Some(name) = alias {
                        let types = field_children(clause, "type");
                        let ty = match types.as_slice() {
                            [only] if self.text(*only) != "nil" => Some(self.ctx().resolve(*only)),
                            _ => None,
                        };
                        self.bind(name, ty);
                    }
                    for stmt in named_children(clause) {
                        if clause.kind() == "type_case" && types_contain(clause, stmt) {
                            continue;
                        }
                        self.walk(stmt);
                    }
                    self.pop_scope();
                }
                _ => {}
            }
        }
        self.pop_scope();
    }

    fn walk_short_var(&mut self, node: Node<'_>) {
        let left = node
            .child_by_field_name("left")
            .map(named_children)
            .unwrap_or_default();
        let right = node
            .child_by_field_name("right")
            .map(named_children)
            .unwrap_or_default();
        for expr in &right {
            self.walk(*expr);
        }
        let types = self.assigned_types(left.len(), &right);
        for (name, ty) in left.into_iter().zip(types) {
            if name.kind() == "identifier" {
                let name = self.text(name);
                self.bind(name, ty);
            }
        }
    }

    fn walk_local_decl(&mut self, node: Node<'_>) {
        let mut specs = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "var_spec" | "const_spec" => specs.push(child),
                "var_spec_list" => specs.extend(named_children(child)),
                _ => {}
            }
        }
        for spec in specs {
            let values = spec
                .child_by_field_name("value")
                .map(named_children)
                .unwrap_or_default();
            for expr in &values {
                self.walk(*expr);
            }
            let names = field_children(spec, "name");
            let types = match spec.child_by_field_name("type") {
                Some(ty) => vec![Some(self.ctx().resolve(ty)); names.len()],
                None => self.assigned_types(names.len(), &values),
            };
            for (name, ty) in names.into_iter().zip(types) {
                let name = self.text(name);
                self.bind(name, ty);
            }
        }
    }

    fn walk_range(&mut self, node: Node<'_>) {
        let Some(right) = node.child_by_field_name("right") else {
            return;
        };
        self.walk(right);
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let ranged = self.type_of(right);
        let (key, value) = match ranged.as_ref().map(GoType::deref) {
            Some(GoType::Slice(elem) | GoType::Array { elem, .. }) => {
                (Some(GoType::builtin("int")), Some(elem.as_ref().clone()))
            }
            Some(GoType::Map { key, value }) => {
                (Some(key.as_ref().clone()), Some(value.as_ref().clone()))
            }
            Some(GoType::Chan { elem, .. }) => (Some(elem.as_ref().clone()), None),
            Some(GoType::Named {
                package: None,
                name,
                ..
            }) if name == "string" => (Some(GoType::builtin("int")), Some(GoType::builtin("rune"))),
            _ => (None, None),
        };
        let names = named_children(left);
        for (name, ty) in names.into_iter().zip([key, value]) {
            if name.kind() == "identifier" {
                let name = self.text(name);
                self.bind(name, ty);
            }
        }
    }

    /// Types bound by `n` names assigned from `values`.
    fn assigned_types(&self, n: usize, values: &[Node<'_>]) -> Vec<Option<GoType>> {
        if values.len() == 1 && n > 1 {
            let value = unparen(values[0]);
            if value.kind() == "call_expression" {
                let results = self.call_results(value).unwrap_or_default();
                return (0..n).map(|i| results.get(i).cloned()).collect();
            }
            let mut out = vec![self.type_of(value), Some(GoType::builtin("bool"))];
            out.resize(n, None);
            return out;
        }
        (0..n)
            .map(|i| values.get(i).and_then(|v| self.type_of(*v)))
            .collect()
    }

    // Calls

    fn record_call(&mut self, call: Node<'_>) {
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        if let Some((token, callee)) = self.resolve_callee(function) {
            let (line, column) = position(token);
            self.calls.push(CallSite {
                line,
                column,
                signature: callee.signature,
            });
        }
    }

    /// Resolves the function a call invokes, returning the callee token.
    fn resolve_callee<'t>(&self, function: Node<'t>) -> Option<(Node<'t>, Callee)> {
        let function = unparen(function);
        match function.kind() {
            "identifier" => {
                let name = self.text(function);
                if self.is_local(name) {
                    return None;
                }
                if let Some(sig) = self.pkg.func(name) {
                    return Some((
                        function,
                        Callee {
                            signature: self.pkg.func_signature(name, sig),
                            sig: sig.clone(),
                        },
                    ));
                }
                if self.pkg.has_var(name) || self.pkg.type_decl(name).is_some() {
                    return None;
                }
                self.imports.dot_imports().iter().find_map(|path| {
                    let pkg = self.scanner.load(path)?;
                    let sig = pkg.func(name)?;
                    Some((
                        function,
                        Callee {
                            signature: pkg.func_signature(name, sig),
                            sig: sig.clone(),
                        },
                    ))
                })
            }
            "selector_expression" => {
                let operand = function.child_by_field_name("operand")?;
                let field = function.child_by_field_name("field")?;
                let name = self.text(field);
                if let Some(path) = self.package_ref(operand) {
                    let pkg = self.scanner.load(path)?;
                    let sig = pkg.func(name)?;
                    return Some((
                        field,
                        Callee {
                            signature: pkg.func_signature(name, sig),
                            sig: sig.clone(),
                        },
                    ));
                }
                if let Some(recv) = self.expr_as_type(operand) {
                    return self.method(&recv, name, 0).map(|c| (field, c));
                }
                let recv = self.type_of(operand)?;
                self.method(&recv, name, 0).map(|c| (field, c))
            }
            // Explicit instantiation `F[int](x)`.
            "index_expression" | "generic_type" => {
                let operand = function
                    .child_by_field_name("operand")
                    .or_else(|| function.child_by_field_name("type"))?;
                self.resolve_callee(operand)
            }
            _ => None,
        }
    }

    /// Import path when `operand` names an imported package.
    fn package_ref(&self, operand: Node<'_>) -> Option<&'a str> {
        if !matches!(operand.kind(), "identifier" | "package_identifier") {
            return None;
        }
        let name = self.text(operand);
        if self.is_local(name) {
            return None;
        }
        self.imports.resolve(name)
    }

    /// Method `name` of `recv`, including methods promoted through embedded
    /// fields.
    fn method(&self, recv: &GoType, name: &str, depth: usize) -> Option<Callee> {
        if depth > MAX_EMBED_DEPTH {
            return None;
        }
        let (pointer, path, ty) = recv.receiver_base()?;
        let pkg = self.scanner.load(path)?;
        if let Some(decl) = pkg.method(ty, name) {
            return Some(Callee {
                signature: pkg.method_signature(ty, name, pointer, decl),
                sig: decl.sig.clone(),
            });
        }
        match pkg.type_decl(ty)? {
            TypeDecl::Alias(target) => {
                let target = if pointer {
                    GoType::Pointer(Box::new(target.clone()))
                } else {
                    target.clone()
                };
                self.method(&target, name, depth + 1)
            }
            TypeDecl::Struct(fields) => {
                if fields.iter().any(|f| !f.embedded && f.name == name) {
                    return None;
                }
                fields
                    .iter()
                    .filter(|f| f.embedded)
                    .find_map(|f| self.method(&f.ty, name, depth + 1))
            }
            TypeDecl::Interface | TypeDecl::Defined(_) => None,
        }
    }

    /// Type of field `name` of a value of type `recv`.
    fn field_type(&self, recv: &GoType, name: &str, depth: usize) -> Option<GoType> {
        if depth > MAX_EMBED_DEPTH {
            return None;
        }
        let (_, path, ty) = recv.receiver_base()?;
        let pkg = self.scanner.load(path)?;
        match pkg.type_decl(ty)? {
            TypeDecl::Struct(fields) => {
                if let Some(field) = fields.iter().find(|f| f.name == name) {
                    return Some(field.ty.clone());
                }
                fields
                    .iter()
                    .filter(|f| f.embedded)
                    .find_map(|f| self.field_type(&f.ty, name, depth + 1))
            }
            TypeDecl::Alias(target) | TypeDecl::Defined(target) => {
                self.field_type(target, name, depth + 1)
            }
            TypeDecl::Interface => None,
        }
    }

    /// Result types of a call expression.
    fn call_results(&self, call: Node<'_>) -> Option<Vec<GoType>> {
        let function = unparen(call.child_by_field_name("function")?);
        if let Some((_, callee)) = self.resolve_callee(function) {
            return Some(callee.sig.results);
        }
        let args = call
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();
        if function.kind() == "identifier" {
            let name = self.text(function);
            if !self.is_local(name) && !self.pkg.has_var(name) && self.pkg.func(name).is_none() {
                match name {
                    "new" => {
                        let ty = self.expr_as_type(*args.first()?)?;
                        return Some(vec![GoType::Pointer(Box::new(ty))]);
                    }
                    "make" => return Some(vec![self.expr_as_type(*args.first()?)?]),
                    "append" => return Some(vec![self.type_of(*args.first()?)?]),
                    "len" | "cap" | "copy" => return Some(vec![GoType::builtin("int")]),
                    _ => {}
                }
            }
        }
        // Conversion `T(x)`.
        if let Some(ty) = self.expr_as_type(function) {
            return Some(vec![ty]);
        }
        match self.type_of(function)? {
            GoType::Func(sig) => Some(sig.results),
            _ => None,
        }
    }

    /// Interprets an expression that denotes a type.
    fn expr_as_type(&self, node: Node<'_>) -> Option<GoType> {
        match node.kind() {
            "identifier" | "type_identifier" => {
                let name = self.text(node);
                if self.is_local(name) {
                    return None;
                }
                let is_type = self.type_params.iter().any(|p| p == name)
                    || BUILTIN_TYPES.contains(&name)
                    || self.pkg.type_decl(name).is_some();
                is_type.then(|| self.ctx().resolve_name(name))
            }
            "selector_expression" => {
                let operand = node.child_by_field_name("operand")?;
                let field = node.child_by_field_name("field")?;
                let path = self.package_ref(operand)?;
                let name = self.text(field);
                let pkg = self.scanner.load(path)?;
                pkg.type_decl(name).map(|_| GoType::named(path, name))
            }
            "parenthesized_expression" | "parenthesized_type" => {
                self.expr_as_type(node.named_child(0)?)
            }
            "unary_expression" => {
                let op = node.child_by_field_name("operator")?;
                if self.text(op) != "*" {
                    return None;
                }
                let inner = self.expr_as_type(node.child_by_field_name("operand")?)?;
                Some(GoType::Pointer(Box::new(inner)))
            }
            "pointer_type" | "slice_type" | "array_type" | "map_type" | "channel_type"
            | "qualified_type" | "generic_type" | "function_type"
            | "implicit_length_array_type" | "struct_type" | "interface_type" => {
                Some(self.ctx().resolve(node))
            }
            _ => None,
        }
    }

    /// Static type of an expression, where it can be inferred.
    fn type_of(&self, expr: Node<'_>) -> Option<GoType> {
        match expr.kind() {
            "identifier" => {
                let name = self.text(expr);
                if let Some(local) = self.local(name) {
                    return local.cloned();
                }
                match name {
                    "true" | "false" => Some(GoType::builtin("bool")),
                    _ => self.pkg.var_type(name).cloned(),
                }
            }
            "parenthesized_expression" => self.type_of(expr.named_child(0)?),
            "selector_expression" => {
                let operand = expr.child_by_field_name("operand")?;
                let field = expr.child_by_field_name("field")?;
                let name = self.text(field);
                if let Some(path) = self.package_ref(operand) {
                    return self.scanner.load(path)?.var_type(name).cloned();
                }
                let base = self.type_of(operand)?;
                self.field_type(&base, name, 0)
            }
            "call_expression" => self.call_results(expr)?.into_iter().next(),
            "unary_expression" => {
                let op = self.text(expr.child_by_field_name("operator")?);
                let operand = expr.child_by_field_name("operand")?;
                match op {
                    "&" => Some(GoType::Pointer(Box::new(self.type_of(operand)?))),
                    "*" => match self.type_of(operand)? {
                        GoType::Pointer(inner) => Some(*inner),
                        _ => None,
                    },
                    "<-" => self.type_of(operand)?.chan_elem(),
                    "!" => Some(GoType::builtin("bool")),
                    _ => self.type_of(operand),
                }
            }
            "composite_literal" => Some(self.ctx().resolve(expr.child_by_field_name("type")?)),
            "index_expression" => self.type_of(expr.child_by_field_name("operand")?)?.index_elem(),
            "slice_expression" => self.type_of(expr.child_by_field_name("operand")?),
            "type_assertion_expression" | "type_conversion_expression" => {
                Some(self.ctx().resolve(expr.child_by_field_name("type")?))
            }
            "func_literal" => Some(GoType::Func(Box::new(self.ctx().signature(
                expr.child_by_field_name("parameters"),
                expr.child_by_field_name("result"),
            )))),
            "interpreted_string_literal" | "raw_string_literal" => Some(GoType::builtin("string")),
            "int_literal" => Some(GoType::builtin("int")),
            "float_literal" => Some(GoType::builtin("float64")),
            "rune_literal" => Some(GoType::builtin("rune")),
            "binary_expression" => {
                let op = self.text(expr.child_by_field_name("operator")?);
                match op {
                    "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => {
                        Some(GoType::builtin("bool"))
                    }
                    _ => self.type_of(expr.child_by_field_name("left")?),
                }
            }
            _ => None,
        }
    }
}

fn types_contain(clause: Node<'_>, node: Node<'_>) -> bool {
    field_children(clause, "type").iter().any(|t| t.id() == node.id())
}

fn unparen(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

fn receiver_type_params(method: Node<'_>, src: &[u8]) -> Vec<String> {
    let Some(receiver) = method.child_by_field_name("receiver") else {
        return Vec::new();
    };
    let Some(param) = named_children(receiver).into_iter().next() else {
        return Vec::new();
    };
    let Some(mut ty) = param.child_by_field_name("type") else {
        return Vec::new();
    };
    while ty.kind() == "pointer_type" {
        match ty.named_child(0) {
            Some(inner) => ty = inner,
            None => return Vec::new(),
        }
    }
    if ty.kind() != "generic_type" {
        return Vec::new();
    }
    ty.child_by_field_name("type_arguments")
        .map(|args| {
            named_children(args)
                .into_iter()
                .map(|a| text(a, src).trim().to_owned())
                .collect()
        })
        .unwrap_or_default()
}
