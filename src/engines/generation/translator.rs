use super::genome::Genome;
use crate::components::{Component, ComponentInstance};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Renders phenotype trees into pipeline construction strings plus their imports.
#[derive(Debug, Clone)]
pub struct PipelineTranslator {
    union_combinator: Component,
    pipeline_combinator: Component,
}

impl Default for PipelineTranslator {
    fn default() -> Self {
        Self::new("sklearn.pipeline.make_union", "sklearn.pipeline.make_pipeline")
    }
}

impl PipelineTranslator {
    pub fn new(union_combinator: &str, pipeline_combinator: &str) -> Self {
        Self {
            union_combinator: Component::new(union_combinator),
            pipeline_combinator: Component::new(pipeline_combinator),
        }
    }

    /// Render one or more roots; several roots are joined with the union combinator.
    pub fn translate(&self, roots: &[ComponentInstance]) -> (String, BTreeSet<String>) {
        let mut imports = BTreeSet::new();
        let rendered: Vec<String> = roots.iter().map(|r| self.render(r, &mut imports)).collect();
        let construction = if rendered.len() == 1 {
            rendered.into_iter().collect()
        } else {
            imports.extend(self.union_combinator.import_lines());
            format!("{}({})", self.union_combinator.short_name(), rendered.join(", "))
        };
        (construction, imports)
    }

    /// Compose a feature extractor and a regressor into one pipeline.
    pub fn compose(
        &self,
        feature_extractor: &str,
        feature_imports: &BTreeSet<String>,
        regressor: &str,
        regressor_imports: &BTreeSet<String>,
    ) -> (String, BTreeSet<String>) {
        let mut imports: BTreeSet<String> = feature_imports.union(regressor_imports).cloned().collect();
        imports.extend(self.pipeline_combinator.import_lines());
        let construction = format!("{}({}, {})", self.pipeline_combinator.short_name(), feature_extractor, regressor);
        (construction, imports)
    }

    pub fn render(&self, instance: &ComponentInstance, imports: &mut BTreeSet<String>) -> String {
        imports.extend(instance.component.import_lines());

        let mut arguments: Vec<String> = instance
            .parameters
            .iter()
            .map(|(name, value)| {
                let numeric = instance
                    .component
                    .parameters
                    .iter()
                    .any(|p| p.name == *name && !p.domain.is_categorical());
                format!("{}={}", name, render_value(value, numeric))
            })
            .collect();

        for required in &instance.component.required_interfaces {
            let mut children: Vec<&ComponentInstance> = instance.children(&required.id).iter().collect();
            if children.is_empty() {
                continue;
            }
            children.sort_by(|a, b| a.name().cmp(b.name()));
            let rendered: Vec<String> = children.iter().map(|c| self.render(c, imports)).collect();
            let value = if required.is_fan_out() {
                format!("[{}]", rendered.join(", "))
            } else {
                rendered.join(", ")
            };
            arguments.push(format!("{}={}", required.id, value));
        }

        format!("{}({})", instance.component.short_name(), arguments.join(", "))
    }
}

/// Literal form of a parameter value in the construction string. Numeric
/// parameters are emitted bare; categorical values only when they are plain
/// decimal literals or one of Python's keyword constants.
fn render_value(value: &str, numeric: bool) -> String {
    if numeric || is_decimal_literal(value) {
        return value.to_string();
    }
    match value.to_ascii_lowercase().as_str() {
        "true" => "True".to_string(),
        "false" => "False".to_string(),
        "none" => "None".to_string(),
        _ => format!("'{}'", value),
    }
}

fn is_decimal_literal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

/// A genome together with the phenotype it decodes to and its rendering.
#[derive(Debug, Clone)]
pub struct DecodedSolution {
    pub genome: Arc<Genome>,
    pub roots: Vec<ComponentInstance>,
    pub construction: String,
    pub imports: BTreeSet<String>,
}

impl DecodedSolution {
    pub fn new(genome: Arc<Genome>, roots: Vec<ComponentInstance>, translator: &PipelineTranslator) -> Self {
        let (construction, imports) = translator.translate(&roots);
        Self {
            genome,
            roots,
            construction,
            imports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Parameter, ParameterDomain, RequiredInterface};

    fn instance(component: Component) -> ComponentInstance {
        ComponentInstance::new(Arc::new(component))
    }

    #[test]
    fn test_two_roots_use_union() {
        let translator = PipelineTranslator::new("combine", "make_pipeline");
        let a = instance(Component::new("A").with_dependency("import b_module").with_dependency("import a_module"));
        let b = instance(Component::new("B").with_dependency("import a_module"));

        let (construction, imports) = translator.translate(&[a, b]);
        assert_eq!(construction, "combine(A(), B())");
        let imports: Vec<&str> = imports.iter().map(String::as_str).collect();
        assert_eq!(imports, vec!["import a_module", "import b_module"]);
    }

    #[test]
    fn test_single_root_renders_parameters_and_children() {
        let translator = PipelineTranslator::default();
        let wrapper = Component::new("ml4pdm.transformation.TsfreshWrapper")
            .with_parameter(Parameter::new("n_jobs", ParameterDomain::integer(1, 4)))
            .with_parameter(Parameter::new("mode", ParameterDomain::categorical(["fast", "slow"])))
            .requires(RequiredInterface::bounded("features", "Feature", 1, 10));

        let mut root = instance(wrapper);
        root.parameters.insert("n_jobs".to_string(), "2".to_string());
        root.parameters.insert("mode".to_string(), "fast".to_string());
        root.satisfaction.insert(
            "features".to_string(),
            vec![instance(Component::new("fx.Minimum")), instance(Component::new("fx.Maximum"))],
        );

        let (construction, imports) = translator.translate(&[root]);
        assert_eq!(construction, "TsfreshWrapper(mode='fast', n_jobs=2, features=[Maximum(), Minimum()])");
        assert!(imports.contains("from ml4pdm.transformation import TsfreshWrapper"));
        assert!(imports.contains("from fx import Maximum"));
        assert!(!imports.iter().any(|i| i.contains("make_union")));
    }

    #[test]
    fn test_rendering_is_order_independent() {
        let translator = PipelineTranslator::default();
        let parent = Component::new("P").requires(RequiredInterface::bounded("xs", "X", 0, 5));
        let mut first = instance(parent.clone());
        first.satisfaction.insert("xs".to_string(), vec![instance(Component::new("B")), instance(Component::new("A"))]);
        let mut second = instance(parent);
        second.satisfaction.insert("xs".to_string(), vec![instance(Component::new("A")), instance(Component::new("B"))]);

        assert_eq!(translator.translate(&[first]).0, translator.translate(&[second]).0);
    }

    #[test]
    fn test_compose_pipeline() {
        let translator = PipelineTranslator::default();
        let fe_imports: BTreeSet<String> = ["from x import Fe".to_string()].into_iter().collect();
        let reg_imports: BTreeSet<String> = ["from y import Reg".to_string()].into_iter().collect();
        let (construction, imports) = translator.compose("Fe()", &fe_imports, "Reg(alpha=0.5)", &reg_imports);
        assert_eq!(construction, "make_pipeline(Fe(), Reg(alpha=0.5))");
        assert_eq!(imports.len(), 3);
        assert!(imports.contains("from sklearn.pipeline import make_pipeline"));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value("0.5", true), "0.5");
        assert_eq!(render_value("12", false), "12");
        assert_eq!(render_value("-0.25", false), "-0.25");
        assert_eq!(render_value("true", false), "True");
        assert_eq!(render_value("None", false), "None");
        assert_eq!(render_value("rbf", false), "'rbf'");
    }

    #[test]
    fn test_float_like_categoricals_are_quoted() {
        for value in ["nan", "inf", "-inf", "1e3", "1.", ".5", "NaN"] {
            assert_eq!(render_value(value, false), format!("'{}'", value));
        }

        let translator = PipelineTranslator::default();
        let component = Component::new("m.Scaler")
            .with_parameter(Parameter::new("fill", ParameterDomain::categorical(["nan", "0"])))
            .with_parameter(Parameter::new("alpha", ParameterDomain::real(0.0, 1.0)));
        let mut scaler = instance(component);
        scaler.parameters.insert("fill".to_string(), "nan".to_string());
        scaler.parameters.insert("alpha".to_string(), "0.5".to_string());
        assert_eq!(translator.translate(&[scaler]).0, "Scaler(alpha=0.5, fill='nan')");
    }
}
