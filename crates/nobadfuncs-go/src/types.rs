//! Go types as they appear in canonical signatures.
//!
//! Every named type is qualified with the full import path of its declaring
//! package, so `*http.Request` written in a file importing `net/http` is
//! rendered `*net/http.Request`.

use std::fmt;

use tree_sitter::Node;

use crate::index::FileImports;
use crate::syntax::{field_children, named_children, text};

/// Predeclared type names. These are never package-qualified.
pub const BUILTIN_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex128",
    "complex64",
    "error",
    "float32",
    "float64",
    "int",
    "int16",
    "int32",
    "int64",
    "int8",
    "rune",
    "string",
    "uint",
    "uint16",
    "uint32",
    "uint64",
    "uint8",
    "uintptr",
];

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    /// `chan T`
    Both,
    /// `chan<- T`
    Send,
    /// `<-chan T`
    Recv,
}

/// A resolved Go type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoType {
    /// A named type. `package` is `None` for predeclared types and type
    /// parameters.
    Named {
        /// Import path of the declaring package.
        package: Option<String>,
        /// Type name.
        name: String,
        /// Type arguments, if instantiated.
        args: Vec<GoType>,
    },
    /// `*T`
    Pointer(Box<GoType>),
    /// `[]T`
    Slice(Box<GoType>),
    /// `[N]T`
    Array {
        /// Length expression as written.
        len: String,
        /// Element type.
        elem: Box<GoType>,
    },
    /// `map[K]V`
    Map {
        /// Key type.
        key: Box<GoType>,
        /// Value type.
        value: Box<GoType>,
    },
    /// `chan T`, `chan<- T`, `<-chan T`
    Chan {
        /// Direction.
        dir: ChanDir,
        /// Element type.
        elem: Box<GoType>,
    },
    /// `func(...) ...`
    Func(Box<FuncSig>),
    /// Struct and interface literals, rendered from normalized source.
    Literal(String),
}

impl GoType {
    /// A predeclared or unqualified named type.
    #[must_use]
    pub fn builtin(name: &str) -> Self {
        Self::Named {
            package: None,
            name: name.to_owned(),
            args: Vec::new(),
        }
    }

    /// A named type declared in `package`.
    #[must_use]
    pub fn named(package: &str, name: &str) -> Self {
        Self::Named {
            package: Some(package.to_owned()),
            name: name.to_owned(),
            args: Vec::new(),
        }
    }

    /// Returns `(is_pointer, package, name)` for `T` and `*T` where `T` is
    /// a named type declared in some package.
    #[must_use]
    pub fn receiver_base(&self) -> Option<(bool, &str, &str)> {
        match self {
            Self::Named {
                package: Some(p),
                name,
                ..
            } => Some((false, p, name)),
            Self::Pointer(inner) => match inner.as_ref() {
                Self::Named {
                    package: Some(p),
                    name,
                    ..
                } => Some((true, p, name)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Strips one level of pointer indirection.
    #[must_use]
    pub fn deref(&self) -> &GoType {
        match self {
            Self::Pointer(inner) => inner,
            other => other,
        }
    }

    /// Element type produced by indexing a value of this type.
    #[must_use]
    pub fn index_elem(&self) -> Option<GoType> {
        match self {
            Self::Slice(elem) | Self::Array { elem, .. } => Some(elem.as_ref().clone()),
            Self::Map { value, .. } => Some(value.as_ref().clone()),
            Self::Pointer(inner) => match inner.as_ref() {
                Self::Array { elem, .. } => Some(elem.as_ref().clone()),
                _ => None,
            },
            Self::Named {
                package: None,
                name,
                ..
            } if name == "string" => Some(Self::builtin("byte")),
            _ => None,
        }
    }

    /// Element type received from a channel.
    #[must_use]
    pub fn chan_elem(&self) -> Option<GoType> {
        match self {
            Self::Chan { elem, .. } => Some(elem.as_ref().clone()),
            _ => None,
        }
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named {
                package,
                name,
                args,
            } => {
                if let Some(p) = package {
                    write!(f, "{p}.")?;
                }
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("[")?;
                    write_list(f, args)?;
                    f.write_str("]")?;
                }
                Ok(())
            }
            Self::Pointer(inner) => write!(f, "*{inner}"),
            Self::Slice(elem) => write!(f, "[]{elem}"),
            Self::Array { len, elem } => write!(f, "[{len}]{elem}"),
            Self::Map { key, value } => write!(f, "map[{key}]{value}"),
            Self::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {elem}"),
                ChanDir::Send => write!(f, "chan<- {elem}"),
                ChanDir::Recv => write!(f, "<-chan {elem}"),
            },
            Self::Func(sig) => write!(f, "func{sig}"),
            Self::Literal(s) => f.write_str(s),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[GoType]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Parameter and result types of a function, names dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncSig {
    /// Parameter types. For variadic functions the last entry is the
    /// element type `T` of `...T`.
    pub params: Vec<GoType>,
    /// Whether the last parameter is variadic.
    pub variadic: bool,
    /// Result types.
    pub results: Vec<GoType>,
}

impl fmt::Display for FuncSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if self.variadic && i == last {
                f.write_str("...")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " {single}"),
            many => {
                f.write_str(" (")?;
                write_list(f, many)?;
                f.write_str(")")
            }
        }
    }
}

/// Resolves type syntax to [`GoType`]s from the point of view of one file.
pub(crate) struct TypeContext<'a> {
    /// Import path of the package the file belongs to.
    pub package: &'a str,
    pub imports: &'a FileImports,
    pub type_params: Vec<String>,
    pub src: &'a [u8],
}

impl<'a> TypeContext<'a> {
    pub fn new(package: &'a str, imports: &'a FileImports, src: &'a [u8]) -> Self {
        Self {
            package,
            imports,
            type_params: Vec::new(),
            src,
        }
    }

    /// Returns a copy with additional type parameters in scope.
    pub fn with_type_params(&self, params: impl IntoIterator<Item = String>) -> Self {
        let mut type_params = self.type_params.clone();
        type_params.extend(params);
        Self {
            package: self.package,
            imports: self.imports,
            type_params,
            src: self.src,
        }
    }

    /// Resolves a bare type name.
    pub fn resolve_name(&self, name: &str) -> GoType {
        if self.type_params.iter().any(|p| p == name) || BUILTIN_TYPES.contains(&name) {
            GoType::builtin(name)
        } else {
            GoType::named(self.package, name)
        }
    }

    /// Resolves a type node.
    pub fn resolve(&self, node: Node<'_>) -> GoType {
        match node.kind() {
            "type_identifier" | "identifier" => self.resolve_name(text(node, self.src)),
            "qualified_type" => {
                let pkg = node
                    .child_by_field_name("package")
                    .map_or("", |n| text(n, self.src));
                let name = node
                    .child_by_field_name("name")
                    .map_or("", |n| text(n, self.src));
                let path = self.imports.resolve(pkg).unwrap_or(pkg);
                GoType::named(path, name)
            }
            "generic_type" => {
                let mut base = node
                    .child_by_field_name("type")
                    .map_or_else(|| GoType::Literal(String::new()), |n| self.resolve(n));
                if let GoType::Named { args, .. } = &mut base {
                    if let Some(list) = node.child_by_field_name("type_arguments") {
                        *args = named_children(list)
                            .into_iter()
                            .map(|n| self.resolve(n))
                            .collect();
                    }
                }
                base
            }
            "pointer_type" => GoType::Pointer(Box::new(self.first_named(node))),
            "slice_type" => GoType::Slice(Box::new(self.field(node, "element"))),
            "array_type" => GoType::Array {
                len: node
                    .child_by_field_name("length")
                    .map_or_else(String::new, |n| text(n, self.src).to_owned()),
                elem: Box::new(self.field(node, "element")),
            },
            "implicit_length_array_type" => GoType::Array {
                len: "...".to_owned(),
                elem: Box::new(self.field(node, "element")),
            },
            "map_type" => GoType::Map {
                key: Box::new(self.field(node, "key")),
                value: Box::new(self.field(node, "value")),
            },
            "channel_type" => {
                let raw = text(node, self.src);
                let dir = if raw.starts_with("<-") {
                    ChanDir::Recv
                } else if raw.trim_start_matches("chan").trim_start().starts_with("<-") {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                GoType::Chan {
                    dir,
                    elem: Box::new(self.field(node, "value")),
                }
            }
            "function_type" => GoType::Func(Box::new(self.signature(
                node.child_by_field_name("parameters"),
                node.child_by_field_name("result"),
            ))),
            "parenthesized_type" | "type_elem" => self.first_named(node),
            _ => GoType::Literal(normalize_literal(text(node, self.src))),
        }
    }

    fn field(&self, node: Node<'_>, name: &str) -> GoType {
        node.child_by_field_name(name)
            .map_or_else(|| GoType::Literal(String::new()), |n| self.resolve(n))
    }

    fn first_named(&self, node: Node<'_>) -> GoType {
        node.named_child(0)
            .map_or_else(|| GoType::Literal(String::new()), |n| self.resolve(n))
    }

    /// Builds a signature from `parameters` and `result` nodes.
    pub fn signature(&self, params: Option<Node<'_>>, result: Option<Node<'_>>) -> FuncSig {
        let mut sig = FuncSig::default();
        if let Some(list) = params {
            for (_, ty, variadic) in self.parameters(list) {
                sig.params.push(ty);
                sig.variadic = variadic;
            }
        }
        if let Some(result) = result {
            sig.results = if result.kind() == "parameter_list" {
                self.parameters(result).into_iter().map(|(_, ty, _)| ty).collect()
            } else {
                vec![self.resolve(result)]
            };
        }
        sig
    }

    /// Expands a `parameter_list` into `(name, type, variadic)` entries, one
    /// per declared name.
    pub fn parameters(&self, list: Node<'_>) -> Vec<(Option<String>, GoType, bool)> {
        let mut out = Vec::new();
        for decl in named_children(list) {
            let variadic = match decl.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let ty = self.field(decl, "type");
            let names = field_children(decl, "name");
            if names.is_empty() {
                out.push((None, ty, variadic));
            } else {
                for name in names {
                    out.push((Some(text(name, self.src).to_owned()), ty.clone(), variadic));
                }
            }
        }
        out
    }
}

/// Names declared by a `type_parameter_list`.
pub(crate) fn type_param_names(list: Option<Node<'_>>, src: &[u8]) -> Vec<String> {
    let Some(list) = list else {
        return Vec::new();
    };
    named_children(list)
        .into_iter()
        .filter(|n| n.kind() == "type_parameter_declaration")
        .flat_map(|decl| field_children(decl, "name"))
        .map(|n| text(n, src).to_owned())
        .collect()
}

fn normalize_literal(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("{ ", "{")
        .replace(" }", "}")
        .replace("interface {", "interface{")
        .replace("struct {", "struct{")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(p: &str, n: &str) -> GoType {
        GoType::named(p, n)
    }

    #[test]
    fn renders_composite_types() {
        let ty = GoType::Map {
            key: Box::new(GoType::builtin("string")),
            value: Box::new(GoType::Slice(Box::new(GoType::Pointer(Box::new(named(
                "net/http", "Request",
            )))))),
        };
        assert_eq!(ty.to_string(), "map[string][]*net/http.Request");

        let ch = GoType::Chan {
            dir: ChanDir::Recv,
            elem: Box::new(GoType::builtin("int")),
        };
        assert_eq!(ch.to_string(), "<-chan int");
    }

    #[test]
    fn renders_signatures() {
        let sig = FuncSig {
            params: vec![GoType::builtin("string"), GoType::Literal("interface{}".into())],
            variadic: true,
            results: vec![GoType::builtin("int"), GoType::builtin("error")],
        };
        assert_eq!(sig.to_string(), "(string, ...interface{}) (int, error)");

        let single = FuncSig {
            params: Vec::new(),
            variadic: false,
            results: vec![GoType::builtin("error")],
        };
        assert_eq!(single.to_string(), "() error");
    }

    #[test]
    fn renders_generic_instances() {
        let ty = GoType::Named {
            package: Some("example.com/list".into()),
            name: "List".into(),
            args: vec![GoType::builtin("T")],
        };
        assert_eq!(GoType::Pointer(Box::new(ty)).to_string(), "*example.com/list.List[T]");
    }

    #[test]
    fn receiver_base_sees_through_one_pointer() {
        let ty = GoType::Pointer(Box::new(named("net/http", "Client")));
        assert_eq!(ty.receiver_base(), Some((true, "net/http", "Client")));
        assert_eq!(GoType::builtin("int").receiver_base(), None);
    }

    #[test]
    fn normalizes_literal_whitespace() {
        assert_eq!(normalize_literal("interface {\n}"), "interface{}");
        assert_eq!(normalize_literal("struct{\n\tX int\n}"), "struct{X int}");
    }
}
