//! Read-only access to the declaration tree.
//!
//! The front end owns the tree; the generator only walks it. `DeclIndex`
//! answers the lookups the generator needs (records and enums by qualified
//! name, visibility, diagnostics) and drives the class walk that feeds every
//! registered [`ClassVisitor`].

use std::collections::HashMap;

use crate::types::{
    Access, Decl, Diagnostic, EnumDecl, RecordDecl, TranslationUnit, TypeName,
};

/// One enclosing scope of a declaration, innermost last.
#[derive(Debug, Clone, Copy)]
pub enum ScopeEntry<'a> {
    /// None for an anonymous namespace.
    Namespace(Option<&'a str>),
    Record(&'a RecordDecl),
}

/// A record definition together with where it was declared.
#[derive(Debug, Clone)]
pub struct ClassContext<'a> {
    pub decl: &'a RecordDecl,
    pub scope: Vec<ScopeEntry<'a>>,
    pub tu: &'a TranslationUnit,
}

impl<'a> ClassContext<'a> {
    /// Fully qualified name, e.g. `ns::Outer::Inner`.
    pub fn qualified_name(&self) -> TypeName {
        scope_name(&self.scope).child(self.decl.name.as_deref())
    }

    pub fn in_anonymous_namespace(&self) -> bool {
        self.scope
            .iter()
            .any(|s| matches!(s, ScopeEntry::Namespace(None)))
    }

    /// True iff the class can be named from the outermost scope through
    /// public members and named namespaces only.
    pub fn is_globally_visible(&self) -> bool {
        if !record_reachable(self.decl) {
            return false;
        }
        self.scope.iter().all(|s| match s {
            ScopeEntry::Namespace(name) => name.is_some(),
            ScopeEntry::Record(r) => record_reachable(r),
        })
    }

    pub fn is_template(&self) -> bool {
        self.decl.template_params.is_some()
    }

    pub fn is_specialization(&self) -> bool {
        self.decl.specialization_args.is_some()
    }

    /// True iff an enclosing record is a class template or a specialization.
    /// Such a member cannot be named without template arguments.
    pub fn in_template_scope(&self) -> bool {
        self.scope.iter().any(|s| {
            matches!(s, ScopeEntry::Record(r)
                if r.template_params.is_some() || r.specialization_args.is_some())
        })
    }
}

fn record_reachable(r: &RecordDecl) -> bool {
    // Anonymous classes are technically reachable through decltype, but the
    // generated code never names them.
    r.name.is_some() && !r.is_local && r.access == Access::Public
}

fn scope_name(scope: &[ScopeEntry<'_>]) -> TypeName {
    TypeName::new(
        scope
            .iter()
            .map(|s| match s {
                ScopeEntry::Namespace(name) => name.map(str::to_string),
                ScopeEntry::Record(r) => r.name.clone(),
            })
            .collect(),
    )
}

/// An enum together with its qualified name.
#[derive(Debug, Clone)]
pub struct EnumContext<'a> {
    pub decl: &'a EnumDecl,
    pub name: TypeName,
}

/// Callback invoked for every record definition during a walk.
pub trait ClassVisitor {
    fn visit_class(&mut self, class: &ClassContext<'_>, index: &DeclIndex<'_>);
}

/// Lookup tables over one or more translation units.
pub struct DeclIndex<'a> {
    units: &'a [TranslationUnit],
    records: HashMap<String, ClassContext<'a>>,
    enums: HashMap<String, EnumContext<'a>>,
}

impl<'a> DeclIndex<'a> {
    pub fn new(units: &'a [TranslationUnit]) -> Self {
        let mut index = Self {
            units,
            records: HashMap::new(),
            enums: HashMap::new(),
        };
        for tu in units {
            let mut scope = Vec::new();
            index.collect(tu, &tu.decls, &mut scope);
        }
        index
    }

    fn collect(
        &mut self,
        tu: &'a TranslationUnit,
        decls: &'a [Decl],
        scope: &mut Vec<ScopeEntry<'a>>,
    ) {
        for decl in decls {
            match decl {
                Decl::Namespace(ns) => {
                    scope.push(ScopeEntry::Namespace(ns.name.as_deref()));
                    self.collect(tu, &ns.decls, scope);
                    scope.pop();
                }
                Decl::Record(r) => {
                    if r.is_definition {
                        let ctx = ClassContext {
                            decl: r,
                            scope: scope.clone(),
                            tu,
                        };
                        // First definition wins; later ones are redeclarations
                        // from another unit including the same header.
                        self.records
                            .entry(ctx.qualified_name().to_string())
                            .or_insert(ctx);
                    }
                    scope.push(ScopeEntry::Record(r));
                    self.collect(tu, &r.decls, scope);
                    scope.pop();
                }
                Decl::Enum(e) => {
                    let name = scope_name(scope).child(e.name.as_deref());
                    self.enums
                        .entry(name.to_string())
                        .or_insert(EnumContext { decl: e, name });
                }
                Decl::Typedef(_) => {}
            }
        }
    }

    pub fn units(&self) -> &'a [TranslationUnit] {
        self.units
    }

    /// The definition of the record with this qualified name, if any unit
    /// defines it.
    pub fn record(&self, qualified: &str) -> Option<&ClassContext<'a>> {
        self.records.get(qualified)
    }

    pub fn enumeration(&self, qualified: &str) -> Option<&EnumContext<'a>> {
        self.enums.get(qualified)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &'a Diagnostic> {
        self.units.iter().flat_map(|tu| tu.diagnostics.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.units.iter().any(TranslationUnit::has_errors)
    }

    /// Visits every record definition of every unit, depth-first in
    /// declaration order, handing each to all `visitors` in turn.
    pub fn walk(&self, visitors: &mut [&mut dyn ClassVisitor]) {
        for tu in self.units {
            let mut scope = Vec::new();
            self.walk_decls(tu, &tu.decls, &mut scope, visitors);
        }
    }

    fn walk_decls(
        &self,
        tu: &'a TranslationUnit,
        decls: &'a [Decl],
        scope: &mut Vec<ScopeEntry<'a>>,
        visitors: &mut [&mut dyn ClassVisitor],
    ) {
        for decl in decls {
            match decl {
                Decl::Namespace(ns) => {
                    scope.push(ScopeEntry::Namespace(ns.name.as_deref()));
                    self.walk_decls(tu, &ns.decls, scope, visitors);
                    scope.pop();
                }
                Decl::Record(r) => {
                    if r.is_definition {
                        let ctx = ClassContext {
                            decl: r,
                            scope: scope.clone(),
                            tu,
                        };
                        for v in visitors.iter_mut() {
                            v.visit_class(&ctx, self);
                        }
                    }
                    scope.push(ScopeEntry::Record(r));
                    self.walk_decls(tu, &r.decls, scope, visitors);
                    scope.pop();
                }
                Decl::Enum(_) | Decl::Typedef(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NamespaceDecl, TemplateParam};

    fn record(name: &str) -> RecordDecl {
        RecordDecl {
            name: Some(name.to_string()),
            is_definition: true,
            from_main_file: true,
            ..Default::default()
        }
    }

    fn unit(decls: Vec<Decl>) -> TranslationUnit {
        TranslationUnit {
            file: "input.hpp".to_string(),
            decls,
            diagnostics: vec![],
        }
    }

    struct Names(Vec<(String, bool)>);

    impl ClassVisitor for Names {
        fn visit_class(&mut self, class: &ClassContext<'_>, _index: &DeclIndex<'_>) {
            self.0
                .push((class.qualified_name().to_string(), class.is_globally_visible()));
        }
    }

    #[test]
    fn test_walk_order_and_visibility() {
        let mut outer = record("Outer");
        let mut hidden = record("Hidden");
        hidden.access = Access::Private;
        outer.decls.push(Decl::Record(hidden));
        outer.decls.push(Decl::Record(record("Inner")));
        let units = vec![unit(vec![
            Decl::Namespace(NamespaceDecl {
                name: Some("ns".to_string()),
                decls: vec![Decl::Record(outer)],
            }),
            Decl::Namespace(NamespaceDecl {
                name: None,
                decls: vec![Decl::Record(record("Anon"))],
            }),
        ])];
        let index = DeclIndex::new(&units);
        let mut names = Names(vec![]);
        let mut visitors: [&mut dyn ClassVisitor; 1] = [&mut names];
        index.walk(&mut visitors);
        assert_eq!(
            names.0,
            vec![
                ("ns::Outer".to_string(), true),
                ("ns::Outer::Hidden".to_string(), false),
                ("ns::Outer::Inner".to_string(), true),
                ("(anonymous namespace)::Anon".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_forward_declaration_is_not_indexed() {
        let mut fwd = record("Foo");
        fwd.is_definition = false;
        let units = vec![unit(vec![Decl::Record(fwd), Decl::Record(record("Bar"))])];
        let index = DeclIndex::new(&units);
        assert!(index.record("Foo").is_none());
        assert!(index.record("Bar").is_some());
    }

    #[test]
    fn test_nested_in_private_class_is_invisible() {
        let mut outer = record("Outer");
        outer.access = Access::Private;
        outer.decls.push(Decl::Record(record("Inner")));
        let units = vec![unit(vec![Decl::Record(record("Top")), Decl::Record(outer)])];
        let index = DeclIndex::new(&units);
        assert!(index.record("Top").unwrap().is_globally_visible());
        assert!(!index.record("Outer::Inner").unwrap().is_globally_visible());
    }

    #[test]
    fn test_members_of_templates_in_template_scope() {
        let mut tmpl = record("Tmpl");
        tmpl.template_params = Some(vec![TemplateParam::Type {
            name: Some("T".to_string()),
            typename: true,
        }]);
        let mut inner = record("Inner");
        inner.decls.push(Decl::Record(record("Deep")));
        tmpl.decls.push(Decl::Record(inner));
        let units = vec![unit(vec![Decl::Record(tmpl), Decl::Record(record("Plain"))])];
        let index = DeclIndex::new(&units);
        assert!(!index.record("Tmpl").unwrap().in_template_scope());
        assert!(index.record("Tmpl::Inner").unwrap().in_template_scope());
        assert!(index.record("Tmpl::Inner::Deep").unwrap().in_template_scope());
        assert!(!index.record("Plain").unwrap().in_template_scope());
    }
}
