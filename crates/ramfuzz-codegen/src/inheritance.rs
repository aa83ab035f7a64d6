//! Base-to-subclass map over every class definition in the input.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ramfuzz_ast::types::{Access, QualType, Type};
use ramfuzz_ast::{ClassContext, ClassVisitor, DeclIndex};
use tracing::trace;

use crate::printer::{template_parameters, template_preamble, TypePrinter};

/// Maps a class to the classes that inherit from it directly and publicly.
/// Classes are keyed by fully qualified name.
pub type Inheritance = BTreeMap<String, BTreeSet<String>>;

/// Boolean facts recorded per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    IsTemplate,
    IsVisible,
}

/// What the generator needs to know about a class after the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDetails {
    pub name: String,
    /// `template<...>\n` for class templates, else empty. Leads the
    /// header note for templates that get no harness.
    pub prefix: String,
    /// `<T1, T2>` for class templates, else empty.
    pub suffix: String,
    /// Also set for members of class templates.
    pub is_template: bool,
    pub is_visible: bool,
}

impl ClassDetails {
    pub fn from_class(class: &ClassContext<'_>, printer: &TypePrinter) -> Self {
        let params = class.decl.template_params.as_deref();
        Self {
            name: class.qualified_name().to_string(),
            prefix: template_preamble(printer, params),
            suffix: template_parameters(params),
            is_template: class.is_template() || class.in_template_scope(),
            is_visible: class.is_globally_visible(),
        }
    }

    pub fn get(&self, detail: Detail) -> bool {
        match detail {
            Detail::IsTemplate => self.is_template,
            Detail::IsVisible => self.is_visible,
        }
    }

    pub fn set(&mut self, detail: Detail, value: bool) {
        match detail {
            Detail::IsTemplate => self.is_template = value,
            Detail::IsVisible => self.is_visible = value,
        }
    }
}

impl fmt::Display for ClassDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.suffix)
    }
}

/// Details keyed by qualified name. Classes never visited have no entry and
/// read as false for every detail.
#[derive(Debug, Clone, Default)]
pub struct ClassDetailsRegistry {
    entries: BTreeMap<String, ClassDetails>,
}

impl ClassDetailsRegistry {
    pub fn get(&self, name: &str, detail: Detail) -> bool {
        self.entries.get(name).is_some_and(|d| d.get(detail))
    }

    pub fn set(&mut self, name: &str, detail: Detail, value: bool) {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| ClassDetails {
                name: name.to_string(),
                ..Default::default()
            })
            .set(detail, value);
    }

    pub fn details(&self, name: &str) -> Option<&ClassDetails> {
        self.entries.get(name)
    }

    fn record(&mut self, details: ClassDetails) {
        self.entries.entry(details.name.clone()).or_insert(details);
    }
}

/// Builds an [`Inheritance`] from a class walk. Use [`process`] on its own,
/// or hand the builder to [`DeclIndex::walk`] alongside other visitors.
///
/// [`process`]: InheritanceBuilder::process
#[derive(Debug, Default)]
pub struct InheritanceBuilder {
    inh: Inheritance,
    details: ClassDetailsRegistry,
    printer: TypePrinter,
}

impl InheritanceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds inheritance among every class in `index`.
    pub fn process(&mut self, index: &DeclIndex<'_>) {
        let mut visitors: [&mut dyn ClassVisitor; 1] = [self];
        index.walk(&mut visitors);
    }

    pub fn inheritance(&self) -> &Inheritance {
        &self.inh
    }

    pub fn details(&self) -> &ClassDetailsRegistry {
        &self.details
    }

    pub fn into_parts(self) -> (Inheritance, ClassDetailsRegistry) {
        (self.inh, self.details)
    }
}

impl ClassVisitor for InheritanceBuilder {
    fn visit_class(&mut self, class: &ClassContext<'_>, index: &DeclIndex<'_>) {
        if class.in_anonymous_namespace() || class.decl.is_implicit {
            return;
        }
        let details = ClassDetails::from_class(class, &self.printer);
        let name = details.name.clone();
        self.details.record(details);
        for base in &class.decl.bases {
            if base.access != Access::Public {
                continue;
            }
            let Some(base_name) = base_name(&base.ty) else {
                continue;
            };
            if let Some(base_class) = index.record(&base_name) {
                self.details
                    .record(ClassDetails::from_class(base_class, &self.printer));
            }
            trace!(base = %base_name, subclass = %name, "inheritance edge");
            self.inh.entry(base_name).or_default().insert(name.clone());
        }
    }
}

/// The class a base specifier names, through typedefs and aliases. A
/// dependent base is keyed by its template parameter.
fn base_name(ty: &QualType) -> Option<String> {
    match ty.desugared().ty {
        Type::Record { name, .. } => Some(name.to_string()),
        Type::TemplateParam { name } => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_default_false() {
        let mut reg = ClassDetailsRegistry::default();
        assert!(!reg.get("A", Detail::IsTemplate));
        assert!(!reg.get("A", Detail::IsVisible));
        reg.set("A", Detail::IsVisible, true);
        assert!(reg.get("A", Detail::IsVisible));
        assert!(!reg.get("A", Detail::IsTemplate));
        reg.set("A", Detail::IsTemplate, true);
        reg.set("A", Detail::IsVisible, false);
        assert!(reg.get("A", Detail::IsTemplate));
        assert!(!reg.get("A", Detail::IsVisible));
    }

    #[test]
    fn test_details_display_includes_parameters() {
        let d = ClassDetails {
            name: "ns::Tmpl".to_string(),
            suffix: "<T>".to_string(),
            ..Default::default()
        };
        assert_eq!(d.to_string(), "ns::Tmpl<T>");
    }
}
