//! Lazy expression graphs for the Earth Engine REST API.
//!
//! Nothing in this module touches pixels. An [`Expr`] describes a
//! server-side computation: a tree of function invocations over constant
//! leaves. [`Expr::serialize`] flattens the tree into the `Expression`
//! object accepted by the `value:compute`, `maps` and `thumbnails`
//! endpoints: a `values` map of `functionInvocationValue` nodes with
//! `constantValue` leaves and `valueReference` edges, plus a `result`
//! pointer at the root.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

/// A node in a server-side computation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value, encoded inline as `constantValue`.
    Constant(Value),
    /// A server-side function invocation.
    Call {
        function: String,
        args: BTreeMap<String, Expr>,
    },
}

impl Expr {
    /// Build a constant leaf.
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    /// Build a function invocation with named arguments.
    pub fn call<const N: usize>(function: &str, args: [(&str, Expr); N]) -> Self {
        Expr::Call {
            function: function.to_string(),
            args: args
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// Serialize into the REST `Expression` object.
    ///
    /// Invocation nodes are numbered in post-order and structurally
    /// deduplicated, so a source image shared by several derived bands
    /// appears in the graph exactly once.
    pub fn serialize(&self) -> Value {
        let mut graph = GraphBuilder::default();
        let result = graph.add(self);
        json!({ "values": Value::Object(graph.values), "result": result })
    }
}

/// Flattens an [`Expr`] tree into the `values` map.
#[derive(Default)]
struct GraphBuilder {
    values: Map<String, Value>,
    /// Canonical node JSON -> assigned id, for structural dedup.
    interned: HashMap<String, String>,
}

impl GraphBuilder {
    fn add(&mut self, expr: &Expr) -> String {
        let node = match expr {
            Expr::Constant(value) => json!({ "constantValue": value }),
            Expr::Call { function, args } => {
                let mut arguments = Map::new();
                for (name, arg) in args {
                    let encoded = match arg {
                        Expr::Constant(value) => json!({ "constantValue": value }),
                        call => json!({ "valueReference": self.add(call) }),
                    };
                    arguments.insert(name.clone(), encoded);
                }
                json!({
                    "functionInvocationValue": {
                        "functionName": function,
                        "arguments": Value::Object(arguments),
                    }
                })
            }
        };
        self.intern(node)
    }

    fn intern(&mut self, node: Value) -> String {
        let key = node.to_string();
        if let Some(id) = self.interned.get(&key) {
            return id.clone();
        }
        let id = self.values.len().to_string();
        self.values.insert(id.clone(), node);
        self.interned.insert(key, id.clone());
        id
    }
}

/// Constructors for server-side reducers.
pub struct Reducer;

impl Reducer {
    /// Mean, min/max and standard deviation over shared inputs, so one
    /// `reduceRegion` pass yields all four statistics.
    pub fn combined_stats() -> Expr {
        let with_min_max = Self::combine(
            Expr::call("Reducer.mean", []),
            Expr::call("Reducer.minMax", []),
        );
        Self::combine(with_min_max, Expr::call("Reducer.stdDev", []))
    }

    /// Per-value frequency counts, used for the three-class histogram.
    pub fn frequency_histogram() -> Expr {
        Expr::call("Reducer.frequencyHistogram", [])
    }

    fn combine(reducer1: Expr, reducer2: Expr) -> Expr {
        Expr::call(
            "Reducer.combine",
            [
                ("reducer1", reducer1),
                ("reducer2", reducer2),
                ("sharedInputs", Expr::constant(true)),
            ],
        )
    }
}

/// Constructors for collection filters.
pub struct Filter;

impl Filter {
    /// Keep elements whose timestamp falls in `[start, end)`.
    ///
    /// The range is the left operand and the element property the right:
    /// the filter asks whether the `DateRange` contains the timestamp.
    pub fn date_range(start: &str, end: &str) -> Expr {
        Expr::call(
            "Filter.dateRangeContains",
            [
                (
                    "leftValue",
                    Expr::call(
                        "DateRange",
                        [
                            ("start", Expr::constant(start)),
                            ("end", Expr::constant(end)),
                        ],
                    ),
                ),
                ("rightField", Expr::constant("system:time_start")),
            ],
        )
    }

    /// Keep elements whose `field` property is strictly below `value`.
    pub fn less_than(field: &str, value: f64) -> Expr {
        Expr::call(
            "Filter.lessThan",
            [
                ("leftField", Expr::constant(field)),
                ("rightValue", Expr::constant(value)),
            ],
        )
    }

    /// Keep elements whose footprint intersects `geometry`.
    pub fn bounds(geometry: Expr) -> Expr {
        let feature = Expr::call("Feature", [("geometry", geometry)]);
        Expr::call(
            "Filter.intersects",
            [
                ("leftField", Expr::constant(".all")),
                ("rightValue", feature),
            ],
        )
    }
}
