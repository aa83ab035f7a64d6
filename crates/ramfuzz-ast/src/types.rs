use std::fmt;

use serde::{Deserialize, Serialize};

/// One translation unit as dumped by the front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Input file path, spelled the way generated code should `#include` it.
    pub file: String,
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationUnit {
    /// True iff the front end reported an error or fatal diagnostic.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error | Severity::Fatal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Note,
    Warning,
    Error,
    Fatal,
}

// ── Declarations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decl {
    Namespace(NamespaceDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
    Typedef(TypedefDecl),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceDecl {
    /// None for an anonymous namespace.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    #[default]
    Class,
    Struct,
    Union,
}

impl TagKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TagKind::Class => "class",
            TagKind::Struct => "struct",
            TagKind::Union => "union",
        }
    }
}

fn yes() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A class, struct or union declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordDecl {
    /// None for anonymous records.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: TagKind,
    /// Access within the enclosing record; namespace-level records are public.
    #[serde(default)]
    pub access: Access,
    /// False for forward declarations.
    #[serde(default = "yes")]
    pub is_definition: bool,
    #[serde(default)]
    pub is_implicit: bool,
    /// Declared inside a function body.
    #[serde(default)]
    pub is_local: bool,
    /// Declared in an input file rather than an included header.
    #[serde(default = "yes")]
    pub from_main_file: bool,
    /// Present iff this record is a class template.
    #[serde(default)]
    pub template_params: Option<Vec<TemplateParam>>,
    /// Present iff this record is a template specialization.
    #[serde(default)]
    pub specialization_args: Option<Vec<TemplateArg>>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub has_implicit_default_ctor: bool,
    #[serde(default)]
    pub bases: Vec<BaseSpecifier>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// Nested declarations.
    #[serde(default)]
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseSpecifier {
    #[serde(rename = "type")]
    pub ty: QualType,
    pub access: Access,
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Method,
    Constructor,
    Destructor,
    Conversion,
    Operator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default = "QualType::void")]
    pub return_type: QualType,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub is_pure: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub access: Access,
}

impl MethodDecl {
    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }

    /// Name plus desugared parameter types; two methods with equal
    /// signatures override one another.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{:?}", p.ty.canonical()))
            .collect();
        format!("{}({}){}", self.name, params.join(","), if self.is_const { " const" } else { "" })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: QualType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: QualType,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scoped: bool,
    #[serde(default)]
    pub enumerators: Vec<String>,
    #[serde(default)]
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: QualType,
    #[serde(default)]
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateParam {
    Type {
        #[serde(default)]
        name: Option<String>,
        /// Declared with `typename` rather than `class`.
        #[serde(default)]
        typename: bool,
    },
    NonType {
        #[serde(default)]
        name: Option<String>,
        #[serde(rename = "type")]
        ty: QualType,
    },
    Template {
        #[serde(default)]
        name: Option<String>,
    },
}

impl TemplateParam {
    pub fn name(&self) -> Option<&str> {
        match self {
            TemplateParam::Type { name, .. }
            | TemplateParam::NonType { name, .. }
            | TemplateParam::Template { name } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateArg {
    Type {
        #[serde(rename = "type")]
        ty: QualType,
    },
    Integral {
        value: i64,
    },
    Expression {
        spelling: String,
    },
}

// ── Types ────────────────────────────────────────────────────────────

/// A type together with its top-level cv-qualifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualType {
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_const: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_volatile: bool,
    #[serde(flatten)]
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Builtin {
        name: Builtin,
    },
    Record {
        name: TypeName,
        /// Non-empty for template specializations.
        #[serde(default)]
        args: Vec<TemplateArg>,
    },
    Enum {
        name: TypeName,
    },
    /// Typedef or alias-declaration sugar.
    Typedef {
        name: TypeName,
        underlying: Box<QualType>,
    },
    /// Elaborated sugar, e.g. `struct A` or `ns::A` as written.
    Elaborated {
        #[serde(default)]
        keyword: Option<TagKind>,
        inner: Box<QualType>,
    },
    Pointer {
        pointee: Box<QualType>,
    },
    LvalueReference {
        pointee: Box<QualType>,
    },
    RvalueReference {
        pointee: Box<QualType>,
    },
    Function {
        ret: Box<QualType>,
        #[serde(default)]
        params: Vec<QualType>,
        #[serde(default)]
        variadic: bool,
    },
    Array {
        element: Box<QualType>,
        #[serde(default)]
        size: Option<u64>,
    },
    /// A dependent template type parameter.
    TemplateParam {
        name: String,
    },
    /// Anything else, as spelled by the front end's own printer.
    Other {
        spelling: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
    #[serde(rename = "void")]
    Void,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "char")]
    Char,
    #[serde(rename = "signed char")]
    SignedChar,
    #[serde(rename = "unsigned char")]
    UnsignedChar,
    #[serde(rename = "wchar_t")]
    WChar,
    #[serde(rename = "char16_t")]
    Char16,
    #[serde(rename = "char32_t")]
    Char32,
    #[serde(rename = "short")]
    Short,
    #[serde(rename = "unsigned short")]
    UnsignedShort,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "unsigned int")]
    UnsignedInt,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "unsigned long")]
    UnsignedLong,
    #[serde(rename = "long long")]
    LongLong,
    #[serde(rename = "unsigned long long")]
    UnsignedLongLong,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "long double")]
    LongDouble,
    #[serde(rename = "std::nullptr_t")]
    NullPtr,
}

impl Builtin {
    /// C++ spelling; `bool` is spelled `_Bool` when `bool_keyword` is off.
    pub fn spelling(self, bool_keyword: bool) -> &'static str {
        match self {
            Builtin::Void => "void",
            Builtin::Bool if bool_keyword => "bool",
            Builtin::Bool => "_Bool",
            Builtin::Char => "char",
            Builtin::SignedChar => "signed char",
            Builtin::UnsignedChar => "unsigned char",
            Builtin::WChar => "wchar_t",
            Builtin::Char16 => "char16_t",
            Builtin::Char32 => "char32_t",
            Builtin::Short => "short",
            Builtin::UnsignedShort => "unsigned short",
            Builtin::Int => "int",
            Builtin::UnsignedInt => "unsigned int",
            Builtin::Long => "long",
            Builtin::UnsignedLong => "unsigned long",
            Builtin::LongLong => "long long",
            Builtin::UnsignedLongLong => "unsigned long long",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::LongDouble => "long double",
            Builtin::NullPtr => "std::nullptr_t",
        }
    }
}

impl QualType {
    pub fn new(ty: Type) -> Self {
        Self {
            is_const: false,
            is_volatile: false,
            ty,
        }
    }

    pub fn void() -> Self {
        Self::builtin(Builtin::Void)
    }

    pub fn builtin(b: Builtin) -> Self {
        Self::new(Type::Builtin { name: b })
    }

    pub fn record(name: &str) -> Self {
        Self::new(Type::Record {
            name: TypeName::parse(name),
            args: Vec::new(),
        })
    }

    pub fn enumeration(name: &str) -> Self {
        Self::new(Type::Enum {
            name: TypeName::parse(name),
        })
    }

    pub fn typedef(name: &str, underlying: QualType) -> Self {
        Self::new(Type::Typedef {
            name: TypeName::parse(name),
            underlying: Box::new(underlying),
        })
    }

    pub fn pointer_to(pointee: QualType) -> Self {
        Self::new(Type::Pointer {
            pointee: Box::new(pointee),
        })
    }

    pub fn lvalue_ref(pointee: QualType) -> Self {
        Self::new(Type::LvalueReference {
            pointee: Box::new(pointee),
        })
    }

    pub fn rvalue_ref(pointee: QualType) -> Self {
        Self::new(Type::RvalueReference {
            pointee: Box::new(pointee),
        })
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Strips top-level typedef and elaborated sugar, accumulating the
    /// cv-qualifiers found along the way.
    pub fn desugared(&self) -> QualType {
        let mut is_const = self.is_const;
        let mut is_volatile = self.is_volatile;
        let mut cur = self;
        loop {
            match &cur.ty {
                Type::Typedef { underlying: inner, .. } | Type::Elaborated { inner, .. } => {
                    cur = inner;
                    is_const |= cur.is_const;
                    is_volatile |= cur.is_volatile;
                }
                _ => break,
            }
        }
        QualType {
            is_const,
            is_volatile,
            ty: cur.ty.clone(),
        }
    }

    /// Desugars recursively, through pointers, references, arrays and
    /// function types.
    pub fn canonical(&self) -> QualType {
        let top = self.desugared();
        let boxed = |q: &QualType| Box::new(q.canonical());
        let ty = match &top.ty {
            Type::Pointer { pointee } => Type::Pointer { pointee: boxed(pointee) },
            Type::LvalueReference { pointee } => Type::LvalueReference { pointee: boxed(pointee) },
            Type::RvalueReference { pointee } => Type::RvalueReference { pointee: boxed(pointee) },
            Type::Array { element, size } => Type::Array {
                element: boxed(element),
                size: *size,
            },
            Type::Function { ret, params, variadic } => Type::Function {
                ret: boxed(ret),
                params: params.iter().map(QualType::canonical).collect(),
                variadic: *variadic,
            },
            other => other.clone(),
        };
        QualType { ty, ..top }
    }

    pub fn unqualified(&self) -> QualType {
        QualType::new(self.ty.clone())
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self.desugared().ty,
            Type::LvalueReference { .. } | Type::RvalueReference { .. }
        )
    }

    /// The referenced type if this is a reference, else self (desugared).
    pub fn non_reference(&self) -> QualType {
        match self.desugared().ty {
            Type::LvalueReference { pointee } | Type::RvalueReference { pointee } => *pointee,
            other => QualType {
                is_const: self.desugared().is_const,
                is_volatile: self.desugared().is_volatile,
                ty: other,
            },
        }
    }

    /// Strips the reference (if any), then every pointer layer, desugaring at
    /// each step. Returns the unqualified value type and the pointer depth.
    pub fn ultimate_pointee(&self) -> (QualType, usize) {
        let mut cur = self.non_reference().desugared();
        let mut depth = 0;
        while let Type::Pointer { pointee } = &cur.ty {
            let next = pointee.desugared();
            cur = next;
            depth += 1;
        }
        (cur.unqualified(), depth)
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self.desugared().ty,
            Type::Builtin {
                name: Builtin::Void
            }
        )
    }

    /// Qualified name of the record this type denotes, looking through sugar.
    pub fn record_name(&self) -> Option<&TypeName> {
        match &self.ty {
            Type::Record { name, .. } => Some(name),
            Type::Typedef { underlying: inner, .. } | Type::Elaborated { inner, .. } => {
                inner.record_name()
            }
            _ => None,
        }
    }

    /// Qualified name of the enum this type denotes, looking through sugar.
    pub fn enum_name(&self) -> Option<&TypeName> {
        match &self.ty {
            Type::Enum { name } => Some(name),
            Type::Typedef { underlying: inner, .. } | Type::Elaborated { inner, .. } => {
                inner.enum_name()
            }
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool {
        self.record_name().is_some()
    }
}

// ── Names ────────────────────────────────────────────────────────────

/// Spelling of an anonymous namespace inside a qualified name.
pub const ANONYMOUS_NAMESPACE: &str = "(anonymous namespace)";

/// A fully qualified name, one segment per enclosing scope. Anonymous
/// namespaces are unnamed segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TypeName {
    segments: Vec<Option<String>>,
}

impl TypeName {
    pub fn new(segments: Vec<Option<String>>) -> Self {
        Self { segments }
    }

    /// Parses `a::(anonymous namespace)::B`. A leading `::` is ignored.
    pub fn parse(s: &str) -> Self {
        let s = s.strip_prefix("::").unwrap_or(s);
        let segments = s
            .split("::")
            .map(|seg| {
                if seg == ANONYMOUS_NAMESPACE {
                    None
                } else {
                    Some(seg.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Option<String>] {
        &self.segments
    }

    /// The unqualified name.
    pub fn last(&self) -> &str {
        self.segments
            .last()
            .and_then(|s| s.as_deref())
            .unwrap_or(ANONYMOUS_NAMESPACE)
    }

    pub fn has_anonymous_segment(&self) -> bool {
        self.segments.iter().any(Option::is_none)
    }

    /// Joins the segments with `::`, dropping anonymous segments when
    /// `skip_anonymous` is set.
    pub fn spell(&self, skip_anonymous: bool) -> String {
        let mut parts = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match seg {
                Some(name) => parts.push(name.as_str()),
                None if skip_anonymous => {}
                None => parts.push(ANONYMOUS_NAMESPACE),
            }
        }
        parts.join("::")
    }

    pub fn child(&self, name: Option<&str>) -> TypeName {
        let mut segments = self.segments.clone();
        segments.push(name.map(str::to_string));
        TypeName { segments }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spell(false))
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        TypeName::parse(&s)
    }
}

impl From<TypeName> for String {
    fn from(n: TypeName) -> Self {
        n.to_string()
    }
}
