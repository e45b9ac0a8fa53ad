//! Earth Engine expression graphs.
//!
//! Expressions are built as a tree of [`Expr`] nodes and serialized into the
//! REST `Expression` shape: a `values` table keyed by id plus the id of the
//! result. Function bodies passed to `Collection.map` must live in the table
//! as their own entries, everything else is nested inline.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Value),
    Invocation {
        function: String,
        arguments: BTreeMap<String, Expr>,
    },
    Argument(String),
    Function {
        parameters: Vec<String>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn null() -> Self {
        Expr::Constant(Value::Null)
    }

    pub fn invoke<'a>(
        function: &str,
        arguments: impl IntoIterator<Item = (&'a str, Expr)>,
    ) -> Self {
        Expr::Invocation {
            function: function.to_string(),
            arguments: arguments.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    /// Invocation of an algorithm that takes no arguments
    pub fn call(function: &str) -> Self {
        Expr::Invocation {
            function: function.to_string(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn argument(name: &str) -> Self {
        Expr::Argument(name.to_string())
    }

    /// Single-parameter function, as used by `Collection.map`
    pub fn function(parameter: &str, body: Expr) -> Self {
        Expr::Function {
            parameters: vec![parameter.to_string()],
            body: Box::new(body),
        }
    }

    /// Name of the invoked algorithm, if this node is an invocation
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Expr::Invocation { function, .. } => Some(function),
            _ => None,
        }
    }

    /// Whether any node in the tree invokes `function`
    pub fn calls(&self, function: &str) -> bool {
        match self {
            Expr::Invocation {
                function: f,
                arguments,
            } => {
                f == function || arguments.values().any(|a| a.calls(function))
            }
            Expr::Function { body, .. } => body.calls(function),
            _ => false,
        }
    }

    // Image algebra. Argument names follow the Earth Engine algorithm catalogue.

    pub fn binary(function: &str, left: Expr, right: Expr) -> Self {
        Expr::invoke(function, [("image1", left), ("image2", right)])
    }

    pub fn image_constant(value: f64) -> Self {
        Expr::invoke("Image.constant", [("value", Expr::constant(value))])
    }

    pub fn select(self, band: &str) -> Self {
        Expr::invoke(
            "Image.select",
            [("input", self), ("bandSelectors", Expr::constant(json!([band])))],
        )
    }

    pub fn rename(self, name: &str) -> Self {
        Expr::invoke("Image.rename", [("input", self), ("names", Expr::constant(json!([name])))])
    }

    pub fn eq_value(self, value: f64) -> Self {
        Expr::binary("Image.eq", self, Expr::image_constant(value))
    }

    pub fn gt_value(self, value: f64) -> Self {
        Expr::binary("Image.gt", self, Expr::image_constant(value))
    }

    pub fn lte_value(self, value: f64) -> Self {
        Expr::binary("Image.lte", self, Expr::image_constant(value))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::binary("Image.or", self, other)
    }

    pub fn not(self) -> Self {
        Expr::invoke("Image.not", [("value", self)])
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::binary("Image.add", self, other)
    }

    pub fn subtract(self, other: Expr) -> Self {
        Expr::binary("Image.subtract", self, other)
    }

    pub fn multiply(self, other: Expr) -> Self {
        Expr::binary("Image.multiply", self, other)
    }

    pub fn divide(self, other: Expr) -> Self {
        Expr::binary("Image.divide", self, other)
    }

    pub fn update_mask(self, mask: Expr) -> Self {
        Expr::invoke("Image.updateMask", [("image", self), ("mask", mask)])
    }

    pub fn clip(self, geometry: Expr) -> Self {
        Expr::invoke("Image.clip", [("input", self), ("geometry", geometry)])
    }

    pub fn resample(self, mode: &str) -> Self {
        Expr::invoke("Image.resample", [("image", self), ("mode", Expr::constant(mode))])
    }

    pub fn reproject(self, crs: &str, scale: f64) -> Self {
        let projection = Expr::invoke("Projection", [("crs", Expr::constant(crs))]);
        Expr::invoke(
            "Image.reproject",
            [("image", self), ("crs", projection), ("scale", Expr::constant(scale))],
        )
    }
}

/// A complete expression ready to be sent to the platform
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Expr,
}

impl Expression {
    pub fn new(root: Expr) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Serialize into `{"result": id, "values": {...}}`
    pub fn to_json(&self) -> Value {
        let mut values = Map::new();
        let result = store(&self.root, &mut values);
        json!({ "result": result, "values": values })
    }
}

// Reserve an id, then fill it, so the result is always "0"
fn store(expr: &Expr, values: &mut Map<String, Value>) -> String {
    let id = values.len().to_string();
    values.insert(id.clone(), Value::Null);
    let node = encode(expr, values);
    values.insert(id.clone(), node);
    id
}

fn encode(expr: &Expr, values: &mut Map<String, Value>) -> Value {
    match expr {
        Expr::Constant(value) => json!({ "constantValue": value }),
        Expr::Argument(name) => json!({ "argumentReference": name }),
        Expr::Invocation {
            function,
            arguments,
        } => {
            let arguments: Map<String, Value> = arguments
                .iter()
                .map(|(name, value)| (name.clone(), encode(value, values)))
                .collect();
            json!({
                "functionInvocationValue": {
                    "functionName": function,
                    "arguments": arguments,
                }
            })
        }
        Expr::Function { parameters, body } => {
            let body_id = store(body, values);
            json!({
                "functionDefinitionValue": {
                    "argumentNames": parameters,
                    "body": body_id,
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_expression() {
        let json = Expression::new(Expr::constant(42)).to_json();
        assert_eq!(json, json!({"result": "0", "values": {"0": {"constantValue": 42}}}));
    }

    #[test]
    fn test_nested_invocation() {
        let expr = Expr::invoke("ImageCollection.load", [("id", Expr::constant("C"))]);
        let size = Expr::invoke("Collection.size", [("collection", expr)]);
        let json = Expression::new(size).to_json();

        let root = &json["values"]["0"]["functionInvocationValue"];
        assert_eq!(root["functionName"], "Collection.size");
        assert_eq!(
            root["arguments"]["collection"]["functionInvocationValue"]["arguments"]["id"]
                ["constantValue"],
            "C"
        );
    }

    #[test]
    fn test_function_body_gets_own_value() {
        let body = Expr::argument("img").select("SCL");
        let mapped = Expr::invoke(
            "Collection.map",
            [
                ("collection", Expr::invoke("ImageCollection.load", [("id", Expr::constant("C"))])),
                ("baseAlgorithm", Expr::function("img", body)),
            ],
        );
        let json = Expression::new(mapped).to_json();

        assert_eq!(json["result"], "0");
        let def = &json["values"]["0"]["functionInvocationValue"]["arguments"]["baseAlgorithm"]
            ["functionDefinitionValue"];
        assert_eq!(def["argumentNames"], json!(["img"]));
        let body_id = def["body"].as_str().unwrap();
        assert_eq!(
            json["values"][body_id]["functionInvocationValue"]["functionName"],
            "Image.select"
        );
    }

    #[test]
    fn test_calls_searches_function_bodies() {
        let expr = Expr::invoke(
            "Collection.map",
            [("baseAlgorithm", Expr::function("x", Expr::argument("x").not()))],
        );
        assert!(expr.calls("Image.not"));
        assert!(!expr.calls("Image.clip"));
        assert_eq!(expr.function_name(), Some("Collection.map"));
    }
}
