//! Emits one `harness<C>` specialization per eligible class.
//!
//! Declarations go to the header stream and out-of-line definitions to the
//! source stream. Cross-class state (referenced and processed classes, enums
//! needing randomizers, value ids) lives in [`GeneratorState`] and is
//! reconciled once in [`HarnessGenerator::finish`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::{self, Write};

use ramfuzz_ast::types::{
    Access, Builtin, FieldDecl, MethodDecl, MethodKind, QualType, RecordDecl, Type,
};
use ramfuzz_ast::{ClassContext, ClassVisitor, DeclIndex};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GenConfig;
use crate::inheritance::{ClassDetails, ClassDetailsRegistry, Detail, Inheritance};
use crate::printer::{valident, TypePrinter};

/// Why a class got no harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Implicit,
    NotMainFile,
    NotVisible,
    Template,
    Specialization,
    AlreadyProcessed,
}

/// Accumulated across every class of one run.
#[derive(Debug, Default)]
pub struct GeneratorState {
    /// Classes whose harness the emitted code uses.
    pub referenced: BTreeSet<String>,
    /// Classes whose harness was emitted, in emission order.
    pub processed: Vec<String>,
    processed_set: HashSet<String>,
    /// Enums needing a randomizer, with their enumerators when known.
    pub enums: BTreeMap<String, Option<Vec<String>>>,
    pub skipped: Vec<(String, SkipReason)>,
    next_valueid: u64,
}

impl GeneratorState {
    fn valueid(&mut self) -> u64 {
        let id = self.next_valueid;
        self.next_valueid += 1;
        id
    }

    /// Referenced minus processed.
    pub fn missing(&self) -> Vec<String> {
        self.referenced
            .iter()
            .filter(|name| !self.processed_set.contains(*name))
            .cloned()
            .collect()
    }
}

/// Per-class bookkeeping, dropped once the class is flushed.
#[derive(Debug, Default)]
struct ClassEmission {
    /// Method-name histogram; the count is the next overload suffix.
    namecount: HashMap<String, u32>,
    /// Constructor harness methods, in emission order.
    ctors: Vec<String>,
    /// All other harness methods, in emission order.
    methods: Vec<String>,
    safe_ctor: Option<String>,
}

impl ClassEmission {
    fn next_name(&mut self, base: &str) -> String {
        let count = self.namecount.entry(base.to_string()).or_insert(0);
        let name = format!("{base}{count}");
        *count += 1;
        name
    }
}

/// How a generated value is produced and handed on.
struct Value {
    /// Expression yielding the value; an lvalue when `by_ref`.
    expr: String,
    by_ref: bool,
    /// Pass on with `std::move`.
    moves: bool,
}

/// True iff producing a value of this type may construct another harness.
fn may_recurse(ty: &QualType) -> bool {
    matches!(ty.ultimate_pointee().0.ty, Type::Record { .. })
}

fn method_recurses(m: &MethodDecl) -> bool {
    m.params.iter().any(|p| may_recurse(&p.ty))
}

fn wants_harness_method(m: &MethodDecl) -> bool {
    m.access == Access::Public
        && !m.is_deleted
        && !m.is_static
        && m.kind != MethodKind::Destructor
}

/// Public, non-static, assignable, non-class fields.
fn wants_setter(f: &FieldDecl) -> bool {
    if f.access != Access::Public || f.is_static {
        return false;
    }
    let ty = f.ty.desugared();
    !ty.is_const
        && !matches!(
            ty.ty,
            Type::Record { .. }
                | Type::LvalueReference { .. }
                | Type::RvalueReference { .. }
                | Type::Array { .. }
                | Type::Function { .. }
        )
}

pub struct HarnessGenerator<'c> {
    config: &'c GenConfig,
    printer: TypePrinter,
    header: String,
    source: String,
    state: GeneratorState,
    /// First formatting failure; the walk callback cannot return it.
    error: Option<fmt::Error>,
}

/// Output of a finished run.
#[derive(Debug)]
pub struct Emitted {
    pub header: String,
    pub source: String,
    pub state: GeneratorState,
}

impl<'c> HarnessGenerator<'c> {
    /// Starts both streams with their includes and the namespace opening.
    pub fn new(config: &'c GenConfig, inputs: &[&str]) -> Result<Self, fmt::Error> {
        let mut gen = Self {
            config,
            printer: TypePrinter::default(),
            header: String::new(),
            source: String::new(),
            state: GeneratorState::default(),
            error: None,
        };
        let h = &mut gen.header;
        writeln!(h, "#define RAMFUZZ_NAMESPACE {}", config.namespace)?;
        writeln!(h, "#include <cstddef>")?;
        writeln!(h, "#include <cstdint>")?;
        writeln!(h, "#include <memory>")?;
        for inc in &config.extra_includes {
            if inc.starts_with('<') {
                writeln!(h, "#include {inc}")?;
            } else {
                writeln!(h, "#include \"{inc}\"")?;
            }
        }
        for f in inputs {
            writeln!(h, "#include \"{f}\"")?;
        }
        writeln!(h, "#include \"{}\"", config.runtime_header)?;
        writeln!(h, "\nnamespace {} {{\n", config.namespace)?;

        let s = &mut gen.source;
        writeln!(s, "#include \"{}\"\n", config.header_name)?;
        writeln!(s, "#include <cstddef>")?;
        writeln!(s, "#include <cstdint>")?;
        writeln!(s, "#include <utility>")?;
        writeln!(s, "\nnamespace {} {{\n", config.namespace)?;
        Ok(gen)
    }

    pub fn state(&self) -> &GeneratorState {
        &self.state
    }

    fn skip_reason(&self, class: &ClassContext<'_>, qual: &str) -> Option<SkipReason> {
        let decl = class.decl;
        if decl.is_implicit {
            Some(SkipReason::Implicit)
        } else if self.config.main_file_only && !decl.from_main_file {
            Some(SkipReason::NotMainFile)
        } else if !class.is_globally_visible() {
            Some(SkipReason::NotVisible)
        } else if class.is_template() || class.in_template_scope() {
            Some(SkipReason::Template)
        } else if class.is_specialization() {
            Some(SkipReason::Specialization)
        } else if self.state.processed_set.contains(qual) {
            Some(SkipReason::AlreadyProcessed)
        } else {
            None
        }
    }

    // ── Values ───────────────────────────────────────────────────────

    /// Requests a value of `ty` from the runtime. Registers the classes and
    /// enums the request depends on.
    fn value(&mut self, ty: &QualType) -> Value {
        let bare = ty.desugared();
        let is_ref = bare.is_reference();
        let is_rvalue = matches!(bare.ty, Type::RvalueReference { .. });
        let (vt, depth) = ty.ultimate_pointee();
        self.register(&vt);
        let id = self.state.valueid();
        let flag = if depth >= 1 || is_ref { ", true" } else { "" };

        if depth == 0 {
            let t = self.printer.print(&vt);
            return Value {
                expr: format!("*g.make< {t}>({id}{flag})"),
                by_ref: true,
                moves: !is_ref || is_rvalue,
            };
        }
        if depth == 1 && vt.ty == (Type::Builtin { name: Builtin::Char }) {
            return Value {
                expr: format!("*g.make< char *>({id})"),
                by_ref: is_ref,
                moves: is_rvalue,
            };
        }
        if is_ref {
            let t = self.printer.print(&pointer_nest(&vt, depth));
            return Value {
                expr: format!("*g.make< {t}>({id}, true)"),
                by_ref: true,
                moves: is_rvalue,
            };
        }
        let t = self.printer.print(&pointer_nest(&vt, depth - 1));
        let call = format!("g.make< {t}>({id}, true)");
        let expr = if depth > 1 {
            // Deep const in the parameter type does not convert implicitly.
            format!("const_cast< {}>({call})", self.printer.print(&bare))
        } else {
            call
        };
        Value {
            expr,
            by_ref: false,
            moves: false,
        }
    }

    fn register(&mut self, vt: &QualType) {
        match &vt.ty {
            Type::Record { .. } => {
                let name = self.printer.print(vt);
                if !self.config.is_runtime_provided(&name) {
                    self.state.referenced.insert(name);
                }
            }
            Type::Enum { .. } => {
                // Enumerators are filled in at finish, once every unit is
                // indexed.
                self.state.enums.entry(self.printer.print(vt)).or_insert(None);
            }
            _ => {}
        }
    }

    // ── Class emission ───────────────────────────────────────────────

    fn emit_class(&mut self, class: &ClassContext<'_>, index: &DeclIndex<'_>) -> fmt::Result {
        let qual = self.printer.name(&class.qualified_name());
        if let Some(reason) = self.skip_reason(class, &qual) {
            debug!(class = %qual, ?reason, "skipping class");
            if reason == SkipReason::Template {
                let details = ClassDetails::from_class(class, &self.printer);
                writeln!(
                    self.header,
                    "// No harness for {}{details}\n",
                    details.prefix.replace('\n', " ")
                )?;
            }
            self.state.skipped.push((qual, reason));
            return Ok(());
        }
        debug!(class = %qual, "generating harness");

        let decl = class.decl;
        let simple = valident(decl.name.as_deref().unwrap_or_default());
        let hc = format!("harness< {qual}>");
        let mut em = ClassEmission::default();

        writeln!(self.header, "template <>")?;
        writeln!(self.header, "class {hc} {{")?;
        writeln!(self.header, " private:")?;
        writeln!(
            self.header,
            "  // Declare first to initialize early; constructors may use it."
        )?;
        writeln!(self.header, "  runtime::gen &g;")?;
        writeln!(
            self.header,
            "  // Owns internally created objects. Must precede obj declaration."
        )?;
        writeln!(self.header, "  std::unique_ptr< {qual}> pobj;")?;
        writeln!(self.header, "  // Prevents infinite recursion.")?;
        writeln!(self.header, "  static unsigned calldepth;")?;
        writeln!(self.source, "unsigned {hc}::calldepth = 0;\n")?;

        if decl.is_abstract {
            self.emit_concrete_impl(class, index, &qual, &hc)?;
        }

        writeln!(self.header, "\n public:")?;
        writeln!(self.header, "  {qual} *obj; // Object under test.")?;
        writeln!(
            self.header,
            "  harness(runtime::gen &g, {qual} &obj) : g(g), obj(&obj) {{}}"
        )?;
        writeln!(
            self.header,
            "  operator bool() const {{ return obj != nullptr; }}"
        )?;
        writeln!(self.header, "  {qual} *release() {{ return pobj.release(); }}")?;

        let methods: Vec<&MethodDecl> =
            decl.methods.iter().filter(|m| wants_harness_method(m)).collect();
        let implicit_ctor = decl.has_implicit_default_ctor;
        em.safe_ctor = find_safe_ctor(&methods, implicit_ctor, &simple);

        for m in &methods {
            self.emit_method(m, &mut em, &qual, &hc, &simple, decl.is_abstract)?;
        }
        if implicit_ctor {
            let name = em.next_name(&simple);
            writeln!(self.header, "  {qual} *{name}();")?;
            let target = if decl.is_abstract {
                "concrete_impl(g)".to_string()
            } else {
                format!("{qual}()")
            };
            writeln!(self.source, "{qual} *{hc}::{name}() {{")?;
            writeln!(self.source, "  return new {target};")?;
            writeln!(self.source, "}}\n")?;
            em.ctors.push(name);
        }
        for f in decl.fields.iter().filter(|f| wants_setter(f)) {
            self.emit_setter(f, &mut em, &hc)?;
        }

        self.emit_roulettes(&em, &qual, &hc)?;
        self.emit_ctors(&em, &hc)?;

        writeln!(self.header, "\n  using submaker = {qual} *(*)(runtime::gen &);")?;
        writeln!(self.header, "  static const submaker submakers[];")?;
        writeln!(self.header, "  static const size_t subcount;")?;
        writeln!(self.header, "}};\n")?;

        self.state.processed_set.insert(qual.clone());
        self.state.processed.push(qual);
        Ok(())
    }

    /// A subclass of an abstract class implementing every pure method
    /// reachable from it, nearest declaration first.
    fn emit_concrete_impl(
        &mut self,
        class: &ClassContext<'_>,
        index: &DeclIndex<'_>,
        qual: &str,
        hc: &str,
    ) -> fmt::Result {
        let mut visited = HashSet::new();
        let mut pure = Vec::new();
        collect_pure(class.decl, index, &mut visited, &mut pure, 0);

        writeln!(self.header, "  class concrete_impl : public {qual} {{")?;
        writeln!(self.header, "    runtime::gen &g;")?;
        writeln!(self.header, "\n   public:")?;
        writeln!(self.header, "    template <typename... Args>")?;
        writeln!(
            self.header,
            "    concrete_impl(runtime::gen &g, Args &&...args)"
        )?;
        writeln!(
            self.header,
            "        : {qual}(std::forward<Args>(args)...), g(g) {{}}"
        )?;
        for m in &pure {
            let params: Vec<String> = m.params.iter().map(|p| self.printer.print(&p.ty)).collect();
            let params = params.join(", ");
            let cq = if m.is_const { " const" } else { "" };
            let scope = format!("{hc}::concrete_impl::");
            let (decl_sig, def_sig) = if m.kind == MethodKind::Conversion {
                (
                    format!("{}({params}){cq} override", m.name),
                    format!("{scope}{}({params}){cq}", m.name),
                )
            } else {
                let ret = self.printer.print(&m.return_type);
                if ret.contains('(') || ret.contains('[') {
                    (
                        format!("auto {}({params}){cq} -> {ret} override", m.name),
                        format!("auto {scope}{}({params}){cq} -> {ret}", m.name),
                    )
                } else {
                    (
                        format!("{ret} {}({params}){cq} override", m.name),
                        format!("{ret} {scope}{}({params}){cq}", m.name),
                    )
                }
            };
            writeln!(self.header, "    {decl_sig};")?;
            if m.return_type.is_void() {
                writeln!(self.source, "{def_sig} {{}}\n")?;
            } else {
                let v = self.value(&m.return_type);
                let ret = if v.moves {
                    format!("std::move({})", v.expr)
                } else {
                    v.expr
                };
                writeln!(self.source, "{def_sig} {{")?;
                writeln!(self.source, "  return {ret};")?;
                writeln!(self.source, "}}\n")?;
            }
        }
        writeln!(self.header, "  }};")?;
        Ok(())
    }

    fn emit_method(
        &mut self,
        m: &MethodDecl,
        em: &mut ClassEmission,
        qual: &str,
        hc: &str,
        simple: &str,
        is_abstract: bool,
    ) -> fmt::Result {
        let is_ctor = m.is_constructor();
        let name = if is_ctor {
            em.next_name(simple)
        } else {
            em.next_name(&valident(&m.name))
        };
        let ret = if is_ctor { format!("{qual} *") } else { "void ".to_string() };
        writeln!(self.header, "  {ret}{name}();")?;
        writeln!(self.source, "{ret}{hc}::{name}() {{")?;

        if method_recurses(m) {
            writeln!(self.source, "  runtime::depth_guard guard(calldepth);")?;
            writeln!(self.source, "  if (guard.breached())")?;
            let bail = match (&em.safe_ctor, is_ctor) {
                (Some(safe), true) => format!("return {safe}();"),
                (None, true) => "return nullptr;".to_string(),
                (_, false) => "return;".to_string(),
            };
            writeln!(self.source, "    {bail}")?;
        }

        let mut args = Vec::with_capacity(m.params.len());
        for (i, p) in m.params.iter().enumerate() {
            let v = self.value(&p.ty);
            let amp = if v.by_ref { "&" } else { "" };
            writeln!(self.source, "  auto {amp}a{i} = {};", v.expr)?;
            args.push(if v.moves {
                format!("std::move(a{i})")
            } else {
                format!("a{i}")
            });
        }
        let args = args.join(", ");
        if is_ctor {
            if is_abstract {
                let sep = if args.is_empty() { "" } else { ", " };
                writeln!(self.source, "  return new concrete_impl(g{sep}{args});")?;
            } else {
                writeln!(self.source, "  return new {qual}({args});")?;
            }
            em.ctors.push(name);
        } else {
            writeln!(self.source, "  obj->{}({args});", m.name)?;
            em.methods.push(name);
        }
        writeln!(self.source, "}}\n")?;
        Ok(())
    }

    fn emit_setter(&mut self, f: &FieldDecl, em: &mut ClassEmission, hc: &str) -> fmt::Result {
        let name = em.next_name(&format!("set_{}", f.name));
        writeln!(self.header, "  void {name}();")?;
        writeln!(self.source, "void {hc}::{name}() {{")?;
        if may_recurse(&f.ty) {
            writeln!(self.source, "  runtime::depth_guard guard(calldepth);")?;
            writeln!(self.source, "  if (guard.breached())")?;
            writeln!(self.source, "    return;")?;
        }
        let v = self.value(&f.ty);
        writeln!(self.source, "  obj->{} = {};", f.name, v.expr)?;
        writeln!(self.source, "}}\n")?;
        em.methods.push(name);
        Ok(())
    }

    fn emit_roulettes(&mut self, em: &ClassEmission, qual: &str, hc: &str) -> fmt::Result {
        writeln!(self.header, "\n  using cptr = {qual} *(harness::*)();")?;
        writeln!(self.header, "  static constexpr unsigned ccount = {};", em.ctors.len())?;
        writeln!(self.header, "  static const cptr croulette[ccount];")?;
        writeln!(self.header, "  using mptr = void (harness::*)();")?;
        writeln!(self.header, "  static constexpr unsigned mcount = {};", em.methods.len())?;
        writeln!(self.header, "  static const mptr mroulette[mcount];")?;

        let entries = |names: &[String]| {
            names
                .iter()
                .map(|n| format!("&{hc}::{n}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(
            self.source,
            "const {hc}::cptr {hc}::croulette[] = {{{}}};",
            entries(&em.ctors)
        )?;
        writeln!(
            self.source,
            "const {hc}::mptr {hc}::mroulette[] = {{{}}};\n",
            entries(&em.methods)
        )?;
        Ok(())
    }

    /// The index-selecting constructor, plus a random-index one when any
    /// constructor exists.
    fn emit_ctors(&mut self, em: &ClassEmission, hc: &str) -> fmt::Result {
        if em.ctors.is_empty() {
            return Ok(());
        }
        writeln!(self.header, "  // Creates obj internally, using indicated constructor.")?;
        writeln!(self.header, "  harness(runtime::gen &g, unsigned ctr);")?;
        writeln!(self.header, "  // Creates obj internally, using a random constructor.")?;
        writeln!(self.header, "  explicit harness(runtime::gen &g);")?;
        writeln!(self.source, "{hc}::harness(runtime::gen &g, unsigned ctr)")?;
        writeln!(
            self.source,
            "    : g(g), pobj((this->*croulette[ctr])()), obj(pobj.get()) {{}}\n"
        )?;
        let id = self.state.valueid();
        writeln!(self.source, "{hc}::harness(runtime::gen &g)")?;
        writeln!(
            self.source,
            "    : harness(g, g.between(0u, ccount - 1, {id})) {{}}\n"
        )?;
        Ok(())
    }

    // ── Finish ───────────────────────────────────────────────────────

    /// Emits enum randomizers and submaker tables, then closes both streams.
    pub fn finish(
        mut self,
        index: &DeclIndex<'_>,
        inheritance: &Inheritance,
        details: &ClassDetailsRegistry,
    ) -> Result<Emitted, fmt::Error> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.emit_enums(index)?;
        self.emit_submakers(inheritance, details)?;
        writeln!(self.header, "}} // namespace {}", self.config.namespace)?;
        writeln!(self.source, "}} // namespace {}", self.config.namespace)?;
        Ok(Emitted {
            header: self.header,
            source: self.source,
            state: self.state,
        })
    }

    fn emit_enums(&mut self, index: &DeclIndex<'_>) -> fmt::Result {
        let names: Vec<String> = self.state.enums.keys().cloned().collect();
        for name in names {
            let enumerators = index
                .enumeration(&name)
                .map(|e| e.decl.enumerators.clone());
            if enumerators.is_none() {
                warn!(enumeration = %name, "enum definition not found; randomizer yields zero");
            }
            writeln!(self.header, "template <>")?;
            writeln!(
                self.header,
                "{name} *runtime::gen::make< {name}>(uint64_t valueid, bool allow_subclass);\n"
            )?;
            writeln!(self.source, "template <>")?;
            writeln!(
                self.source,
                "{name} *runtime::gen::make< {name}>(uint64_t valueid, bool) {{"
            )?;
            match enumerators.as_deref() {
                Some(list) if !list.is_empty() => {
                    let values: Vec<String> =
                        list.iter().map(|e| format!("{name}::{e}")).collect();
                    writeln!(
                        self.source,
                        "  static const {name} enumerators[] = {{{}}};",
                        values.join(", ")
                    )?;
                    writeln!(
                        self.source,
                        "  return new {name}(enumerators[between(size_t{{0}}, sizeof(enumerators) / sizeof(*enumerators) - 1, valueid)]);"
                    )?;
                }
                _ => writeln!(self.source, "  return new {name}(static_cast< {name}>(0));")?,
            }
            writeln!(self.source, "}}\n")?;
            self.state.enums.insert(name, enumerators);
        }
        Ok(())
    }

    fn emit_submakers(
        &mut self,
        inheritance: &Inheritance,
        details: &ClassDetailsRegistry,
    ) -> fmt::Result {
        let processed = self.state.processed.clone();
        for qual in &processed {
            let hc = format!("harness< {qual}>");
            let subs: Vec<&String> = inheritance
                .get(qual)
                .map(|s| {
                    s.iter()
                        .filter(|sub| {
                            details.get(sub, Detail::IsVisible)
                                && !details.get(sub, Detail::IsTemplate)
                        })
                        .collect()
                })
                .unwrap_or_default();
            let mut trampolines = Vec::with_capacity(subs.len());
            if !subs.is_empty() {
                writeln!(self.source, "namespace {{")?;
                for (k, sub) in subs.iter().enumerate() {
                    let sub = sub.to_string();
                    let fname = format!("submake_{}_{k}", valident(qual));
                    let id = self.state.valueid();
                    writeln!(
                        self.source,
                        "{qual} *{fname}(runtime::gen &g) {{ return g.make< {sub}>({id}, true); }}"
                    )?;
                    if !self.config.is_runtime_provided(&sub) {
                        self.state.referenced.insert(sub);
                    }
                    trampolines.push(fname);
                }
                writeln!(self.source, "}} // namespace")?;
            }
            writeln!(
                self.source,
                "const {hc}::submaker {hc}::submakers[] = {{{}}};",
                trampolines.join(", ")
            )?;
            writeln!(
                self.source,
                "const size_t {hc}::subcount = {};\n",
                trampolines.len()
            )?;
        }
        Ok(())
    }
}

impl ClassVisitor for HarnessGenerator<'_> {
    fn visit_class(&mut self, class: &ClassContext<'_>, index: &DeclIndex<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.emit_class(class, index) {
            self.error = Some(e);
        }
    }
}

/// `vt` under `depth` pointer layers.
fn pointer_nest(vt: &QualType, depth: usize) -> QualType {
    (0..depth).fold(vt.clone(), |t, _| QualType::pointer_to(t))
}

/// Harness-method name of the first constructor that cannot recurse, the
/// implicit default constructor counting last.
fn find_safe_ctor(methods: &[&MethodDecl], implicit_ctor: bool, simple: &str) -> Option<String> {
    let ctors: Vec<&&MethodDecl> = methods.iter().filter(|m| m.is_constructor()).collect();
    if let Some(k) = ctors.iter().position(|m| !method_recurses(m)) {
        return Some(format!("{simple}{k}"));
    }
    implicit_ctor.then(|| format!("{simple}{}", ctors.len()))
}

/// Deepest base chain followed when collecting pure methods.
const MAX_BASE_DEPTH: usize = 64;

/// Pure methods of `record` and its bases not overridden nearer to the most
/// derived class. `visited` holds signatures already declared.
fn collect_pure(
    record: &RecordDecl,
    index: &DeclIndex<'_>,
    visited: &mut HashSet<String>,
    out: &mut Vec<MethodDecl>,
    depth: usize,
) {
    if depth > MAX_BASE_DEPTH {
        return;
    }
    for m in &record.methods {
        if matches!(m.kind, MethodKind::Constructor | MethodKind::Destructor) {
            continue;
        }
        if visited.insert(m.signature()) && m.is_pure {
            out.push(m.clone());
        }
    }
    for base in &record.bases {
        let Some(name) = base.ty.record_name() else {
            continue;
        };
        if let Some(ctx) = index.record(&name.to_string()) {
            collect_pure(ctx.decl, index, visited, out, depth + 1);
        }
    }
}
