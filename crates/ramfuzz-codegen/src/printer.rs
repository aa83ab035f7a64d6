//! Renders types and names as C++ source text usable from inside the
//! generated namespace.

use ramfuzz_ast::types::{QualType, TemplateArg, TemplateParam, Type, TypeName};

/// Knobs for [`TypePrinter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintingPolicy {
    /// Spell `bool` rather than `_Bool`.
    pub bool_keyword: bool,
    /// Drop `struct`/`class`/`union` written before a type name.
    pub suppress_tag_keyword: bool,
    /// Drop anonymous-namespace segments, which generated code cannot name.
    pub suppress_unwritten_scope: bool,
    /// Print bare names without their qualifying scope.
    pub suppress_scope: bool,
}

impl Default for PrintingPolicy {
    fn default() -> Self {
        Self {
            bool_keyword: true,
            suppress_tag_keyword: true,
            suppress_unwritten_scope: true,
            suppress_scope: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TypePrinter {
    pub policy: PrintingPolicy,
}

impl TypePrinter {
    pub fn new(policy: PrintingPolicy) -> Self {
        Self { policy }
    }

    /// The type as it would appear in a declaration with no declarator name,
    /// e.g. `const ns::A &` or `int(*)(int, double)`.
    pub fn print(&self, ty: &QualType) -> String {
        self.declarator(ty, String::new())
    }

    /// A qualified name, honoring the scope flags.
    pub fn name(&self, name: &TypeName) -> String {
        if self.policy.suppress_scope {
            name.last().to_string()
        } else {
            name.spell(self.policy.suppress_unwritten_scope)
        }
    }

    /// Prints `ty` around `inner`, the part of the declarator already built.
    /// Pointers and references grow `inner` leftwards; functions and arrays
    /// grow it rightwards.
    fn declarator(&self, ty: &QualType, inner: String) -> String {
        match &ty.ty {
            Type::Pointer { pointee } => self.declarator(pointee, indirection("*", ty, inner, pointee)),
            Type::LvalueReference { pointee } => {
                self.declarator(pointee, indirection("&", ty, inner, pointee))
            }
            Type::RvalueReference { pointee } => {
                self.declarator(pointee, indirection("&&", ty, inner, pointee))
            }
            Type::Array { element, size } => {
                let dim = size.map(|n| n.to_string()).unwrap_or_default();
                self.declarator(element, format!("{inner}[{dim}]"))
            }
            Type::Function {
                ret,
                params,
                variadic,
            } => {
                let mut list: Vec<String> = params.iter().map(|p| self.print(p)).collect();
                if *variadic {
                    list.push("...".to_string());
                }
                self.declarator(ret, format!("{inner}({})", list.join(", ")))
            }
            Type::Typedef { underlying, .. } => {
                let mut under = (**underlying).clone();
                under.is_const |= ty.is_const;
                under.is_volatile |= ty.is_volatile;
                self.declarator(&under, inner)
            }
            Type::Elaborated { keyword, inner: named } => {
                let mut under = (**named).clone();
                under.is_const |= ty.is_const;
                under.is_volatile |= ty.is_volatile;
                match keyword {
                    Some(tag) if !self.policy.suppress_tag_keyword => {
                        let leaf = format!("{}{} {}", cv(&under), tag.keyword(), self.leaf(&under.ty));
                        join(leaf, inner)
                    }
                    _ => self.declarator(&under, inner),
                }
            }
            leaf => join(format!("{}{}", cv(ty), self.leaf(leaf)), inner),
        }
    }

    fn leaf(&self, ty: &Type) -> String {
        match ty {
            Type::Builtin { name } => name.spelling(self.policy.bool_keyword).to_string(),
            Type::Record { name, args } if args.is_empty() => self.name(name),
            Type::Record { name, args } => format!("{}{}", self.name(name), self.template_args(args)),
            Type::Enum { name } => self.name(name),
            Type::TemplateParam { name } => name.clone(),
            Type::Other { spelling } => spelling.clone(),
            // Composite shapes only reach here through an elaborated keyword;
            // fall back to a bare rendering.
            other => self.print(&QualType::new(other.clone())),
        }
    }

    /// `< int, ns::A>`; the space after `<` keeps `<:` from lexing as a
    /// digraph.
    pub fn template_args(&self, args: &[TemplateArg]) -> String {
        let printed: Vec<String> = args
            .iter()
            .map(|arg| match arg {
                TemplateArg::Type { ty } => self.print(ty),
                TemplateArg::Integral { value } => value.to_string(),
                TemplateArg::Expression { spelling } => spelling.clone(),
            })
            .collect();
        format!("< {}>", printed.join(", "))
    }
}

fn cv(ty: &QualType) -> &'static str {
    match (ty.is_const, ty.is_volatile) {
        (false, false) => "",
        (true, false) => "const ",
        (false, true) => "volatile ",
        (true, true) => "const volatile ",
    }
}

/// Wraps `inner` in one pointer or reference layer, qualified by `ty`'s cv.
fn indirection(op: &str, ty: &QualType, inner: String, pointee: &QualType) -> String {
    let mut s = op.to_string();
    if ty.is_const {
        s.push_str("const");
    }
    if ty.is_volatile {
        s.push_str(if ty.is_const { " volatile" } else { "volatile" });
    }
    if !inner.is_empty() {
        if ty.is_const || ty.is_volatile {
            s.push(' ');
        }
        s.push_str(&inner);
    }
    // Pointer to function or array needs parentheses to bind.
    match pointee.desugared().ty {
        Type::Function { .. } | Type::Array { .. } => format!("({s})"),
        _ => s,
    }
}

fn join(leaf: String, inner: String) -> String {
    if inner.is_empty() {
        leaf
    } else if inner.starts_with('(') || inner.starts_with('[') {
        format!("{leaf}{inner}")
    } else {
        format!("{leaf} {inner}")
    }
}

/// A valid identifier from a method name: every operator character maps to a
/// fixed letter, so `operator+=` becomes `operatorpe`.
pub fn valident(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' => '_',
            '=' => 'e',
            '+' => 'p',
            '-' => 'm',
            '*' => 's',
            '/' => 'd',
            '%' => 'c',
            '&' => 'a',
            '|' => 'f',
            '^' => 'r',
            '<' => 'l',
            '>' => 'g',
            '~' => 't',
            '!' => 'b',
            '[' => 'h',
            ']' => 'i',
            '(' => 'j',
            ')' => 'k',
            '.' => 'n',
            ':' => 'q',
            ',' => 'o',
            other => other,
        })
        .collect()
}

/// Placeholder for unnamed template parameters.
pub const DEFAULT_TYPENAME: &str = "ramfuzz_typename_placeholder";

/// `template<typename T, int N>` plus a newline, or empty for `None`.
pub fn template_preamble(printer: &TypePrinter, params: Option<&[TemplateParam]>) -> String {
    let Some(params) = params else {
        return String::new();
    };
    let list: Vec<String> = params
        .iter()
        .map(|p| {
            let name = p.name().unwrap_or(DEFAULT_TYPENAME);
            match p {
                TemplateParam::Type { typename: true, .. } => format!("typename {name}"),
                TemplateParam::Type { .. } => format!("class {name}"),
                TemplateParam::NonType { ty, .. } => join(printer.print(ty), name.to_string()),
                TemplateParam::Template { .. } => format!("template<typename> class {name}"),
            }
        })
        .collect();
    format!("template<{}>\n", list.join(", "))
}

/// `<T1, T2>`, or empty for `None`.
pub fn template_parameters(params: Option<&[TemplateParam]>) -> String {
    match params {
        Some(params) => {
            let names: Vec<&str> = params
                .iter()
                .map(|p| p.name().unwrap_or(DEFAULT_TYPENAME))
                .collect();
            format!("<{}>", names.join(", "))
        }
        None => String::new(),
    }
}
