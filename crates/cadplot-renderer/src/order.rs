//! Draw order.
//!
//! SVG has no z-index, so later elements paint over earlier ones. Lower
//! layers are emitted first; within a layer, emission order is kept.

use cadplot_core::LayerId;

/// Anything that can be placed in draw order.
pub trait Layered {
    fn layer(&self) -> LayerId;
}

impl Layered for cadplot_core::ResolvedPath {
    fn layer(&self) -> LayerId {
        self.layer
    }
}

/// Stable sort by layer, lowest first.
pub fn linearize<T: Layered>(records: &mut [T]) {
    records.sort_by_key(|r| r.layer());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Record {
        layer: LayerId,
        tag: &'static str,
    }

    impl Layered for Record {
        fn layer(&self) -> LayerId {
            self.layer
        }
    }

    #[test]
    fn test_layer_order_is_stable() {
        let mut records = vec![
            Record { layer: 5, tag: "first five" },
            Record { layer: 1, tag: "one" },
            Record { layer: 5, tag: "second five" },
            Record { layer: 3, tag: "three" },
        ];
        linearize(&mut records);

        let layers: Vec<LayerId> = records.iter().map(|r| r.layer).collect();
        assert_eq!(layers, vec![1, 3, 5, 5]);
        assert_eq!(records[2].tag, "first five");
        assert_eq!(records[3].tag, "second five");
    }

    #[test]
    fn test_empty_and_single() {
        let mut empty: Vec<Record> = Vec::new();
        linearize(&mut empty);
        assert!(empty.is_empty());

        let mut one = vec![Record { layer: 9, tag: "only" }];
        linearize(&mut one);
        assert_eq!(one[0].tag, "only");
    }
}
