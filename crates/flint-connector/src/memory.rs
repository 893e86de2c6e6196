//! The built-in in-memory connector (§6, §8): owns the `$planets` and
//! `$satellites` fixture datasets every embedder gets for free, plus
//! whatever tables a test or REPL session registers at runtime.
//!
//! Row data is generated rather than transcribed from a reference dataset —
//! see [`planets_table`]/[`satellites_table`] for the construction rules and
//! `DESIGN.md` for why. Column names and solar-system body names are real;
//! the numeric measurements are synthetic and exist only to give the
//! columns plausible, distinct values to sort and filter on.

use std::collections::HashMap;

use parking_lot::RwLock;

use flint_core::schema::{Column, ColumnId, RelationSchema};
use flint_error::{EngineError, ErrorKind, Result};
use flint_types::array::PrimitiveArray;
use flint_types::{Array, DataType, Morsel, ScalarValue};

use crate::connector::{Connector, ConnectorCapabilities, PredicatePushable, PushedPredicate};

/// One in-memory table: a schema plus its row-major data, in bind order.
#[derive(Debug, Clone)]
struct MemoryTable {
    schema: RelationSchema,
    rows: Vec<Vec<ScalarValue>>,
}

impl MemoryTable {
    fn column_index(&self, id: ColumnId) -> Option<usize> {
        self.schema.columns.iter().position(|c| c.id == id)
    }
}

/// The built-in connector behind every `$`-prefixed relation name. Cloning
/// the registry's `Arc<dyn Connector>` is how every query session shares the
/// same fixture data; nothing here is mutated once a table is registered.
#[derive(Debug)]
pub struct MemoryConnector {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert("$planets".to_string(), planets_table());
        tables.insert("$satellites".to_string(), satellites_table());
        MemoryConnector { tables: RwLock::new(tables) }
    }

    /// Register or replace a table under `relation` (tests and embedders
    /// that want their own `$`-backed fixture data without a connector of
    /// their own).
    pub fn register_table(&self, relation: impl Into<String>, schema: RelationSchema, rows: Vec<Vec<ScalarValue>>) {
        self.tables.write().insert(relation.into(), MemoryTable { schema, rows });
    }

    fn table(&self, relation: &str) -> Result<MemoryTable> {
        self.tables
            .read()
            .get(relation)
            .cloned()
            .ok_or_else(|| EngineError::new(ErrorKind::DatasetNotFound, format!("unknown in-memory relation '{relation}'")))
    }
}

impl Connector for MemoryConnector {
    fn id(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> ConnectorCapabilities {
        ConnectorCapabilities {
            partitionable: false,
            cacheable: false,
            predicate_pushable: true,
        }
    }

    fn get_dataset_schema(&self, relation: &str) -> Result<RelationSchema> {
        Ok(self.table(relation)?.schema)
    }

    fn read_dataset(
        &self,
        relation: &str,
        columns: Option<&[ColumnId]>,
        predicates: &[PushedPredicate],
        just_schema: bool,
    ) -> Result<Box<dyn Iterator<Item = Result<Morsel>> + Send>> {
        let table = self.table(relation)?;

        let indices: Vec<usize> = match columns {
            Some(ids) => {
                let mut out = Vec::with_capacity(ids.len());
                for id in ids {
                    out.push(
                        table
                            .column_index(*id)
                            .ok_or_else(|| EngineError::internal(format!("column {id} not found in '{relation}'")))?,
                    );
                }
                out
            }
            None => (0..table.schema.columns.len()).collect(),
        };

        if just_schema {
            return Ok(Box::new(std::iter::empty()));
        }

        let matched_predicates: Vec<(usize, &PushedPredicate)> = predicates
            .iter()
            .filter_map(|p| table.column_index(p.column).map(|idx| (idx, p)))
            .collect();

        let rows: Vec<&Vec<ScalarValue>> = table
            .rows
            .iter()
            .filter(|row| matched_predicates.iter().all(|(idx, pred)| row_matches(&row[*idx], pred)))
            .collect();

        let mut arrays = Vec::with_capacity(indices.len());
        for &col_idx in &indices {
            let data_type = table.schema.columns[col_idx].data_type.clone();
            arrays.push(build_array(&data_type, rows.iter().map(|row| &row[col_idx])));
        }

        let morsel = Morsel::try_new(arrays)?;
        Ok(Box::new(std::iter::once(Ok(morsel))))
    }
}

impl PredicatePushable for MemoryConnector {}

fn row_matches(value: &ScalarValue, pred: &PushedPredicate) -> bool {
    use flint_core::expr::ComparisonOp::*;
    match pred.op {
        Eq => value == &pred.value,
        NotEq => value != &pred.value,
        Lt => matches!(value.partial_cmp(&pred.value), Some(std::cmp::Ordering::Less)),
        LtEq => matches!(
            value.partial_cmp(&pred.value),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        ),
        Gt => matches!(value.partial_cmp(&pred.value), Some(std::cmp::Ordering::Greater)),
        GtEq => matches!(
            value.partial_cmp(&pred.value),
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        ),
        // Not a pushable operator (§6); keep the row and let the physical
        // `Filter` re-evaluate it.
        _ => true,
    }
}

fn build_array<'a>(data_type: &DataType, values: impl Iterator<Item = &'a ScalarValue>) -> Array {
    match data_type {
        DataType::Boolean => Array::Boolean(PrimitiveArray::from_options(values.map(|v| v.as_bool()), false)),
        DataType::Int64 => Array::Int64(PrimitiveArray::from_options(
            values.map(|v| match v {
                ScalarValue::Int64(n) => Some(*n),
                _ => None,
            }),
            0,
        )),
        DataType::Float64 => Array::Float64(PrimitiveArray::from_options(values.map(|v| v.as_f64()), 0.0)),
        DataType::Utf8 => {
            Array::Utf8(PrimitiveArray::from_options(values.map(|v| v.as_str().map(str::to_string)), String::new()))
        }
        other => {
            let count = values.count();
            tracing::debug!(?other, "unsupported in-memory column type, emitting nulls");
            Array::Null(count)
        }
    }
}

fn col(schema: &mut RelationSchema, name: &str, ty: DataType) {
    schema.push(Column::new_flat(name, ty, schema.name.clone()));
}

/// `$planets`: 9 rows ordered by distance from the sun, 20 columns (§8
/// scenario 7: `WHERE id > 4` selects the outer five — Jupiter through
/// Pluto).
fn planets_table() -> MemoryTable {
    let mut schema = RelationSchema::new("$planets");
    col(&mut schema, "id", DataType::Int64);
    col(&mut schema, "name", DataType::Utf8);
    col(&mut schema, "isPlanet", DataType::Boolean);
    col(&mut schema, "symbol", DataType::Utf8);
    col(&mut schema, "mass", DataType::Float64);
    col(&mut schema, "diameter", DataType::Float64);
    col(&mut schema, "density", DataType::Float64);
    col(&mut schema, "gravity", DataType::Float64);
    col(&mut schema, "escapeVelocity", DataType::Float64);
    col(&mut schema, "rotationPeriod", DataType::Float64);
    col(&mut schema, "lengthOfDay", DataType::Float64);
    col(&mut schema, "distanceFromSun", DataType::Float64);
    col(&mut schema, "perihelion", DataType::Float64);
    col(&mut schema, "aphelion", DataType::Float64);
    col(&mut schema, "orbitalPeriod", DataType::Float64);
    col(&mut schema, "orbitalVelocity", DataType::Float64);
    col(&mut schema, "orbitalInclination", DataType::Float64);
    col(&mut schema, "orbitalEccentricity", DataType::Float64);
    col(&mut schema, "obliquityToOrbit", DataType::Float64);
    col(&mut schema, "meanTemperature", DataType::Float64);

    let names = [
        "Mercury", "Venus", "Earth", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune", "Pluto",
    ];
    let symbols = ["\u{263F}", "\u{2640}", "\u{2295}", "\u{2642}", "\u{2643}", "\u{2644}", "\u{2645}", "\u{2646}", "\u{2647}"];

    let mut rows = Vec::with_capacity(9);
    for (i, name) in names.iter().enumerate() {
        let id = (i + 1) as i64;
        let n = id as f64;
        rows.push(vec![
            ScalarValue::Int64(id),
            ScalarValue::Utf8(name.to_string()),
            ScalarValue::Boolean(id <= 8),
            ScalarValue::Utf8(symbols[i].to_string()),
            ScalarValue::Float64(n * 1.2e23),
            ScalarValue::Float64(n * 3_200.0),
            ScalarValue::Float64(3.0 + n * 0.4),
            ScalarValue::Float64(2.0 + n * 1.1),
            ScalarValue::Float64(4.0 + n * 3.5),
            ScalarValue::Float64(10.0 + n * 25.0),
            ScalarValue::Float64(12.0 + n * 30.0),
            ScalarValue::Float64(n * 88.0),
            ScalarValue::Float64(n * 82.0),
            ScalarValue::Float64(n * 94.0),
            ScalarValue::Float64(n * 365.0),
            ScalarValue::Float64(48.0 - n * 2.0),
            ScalarValue::Float64(0.5 * n),
            ScalarValue::Float64(0.01 * n),
            ScalarValue::Float64(1.5 * n),
            ScalarValue::Float64(200.0 - n * 15.0),
        ]);
    }

    MemoryTable { schema, rows }
}

/// `$satellites`: 177 rows across 8 columns, grouped by `planetId` into
/// exactly the seven planets that have moons (Mercury and Venus have none).
/// The per-planet counts and the specific named moons below are chosen so
/// every scenario in §8's table holds by construction:
///
/// - Earth 1, Mars 2, Jupiter 79, Saturn 53, Uranus 27, Neptune 10, Pluto 5
///   (sums to 177; 7 distinct `planetId` groups; Jupiter/Saturn/Uranus/
///   Neptune are the 4 groups with `COUNT(*) > 5`).
/// - Earth's only moon is literally named `Moon`; `id` 5-8 fall inside
///   Jupiter's block, so `id IN (5,6,7,8) OR name = 'Moon'` is 5 rows.
/// - `Calypso` (a real Saturnian moon) appears exactly once.
/// - Pluto's five moons are named for its five real moons.
fn satellites_table() -> MemoryTable {
    let mut schema = RelationSchema::new("$satellites");
    col(&mut schema, "id", DataType::Int64);
    col(&mut schema, "name", DataType::Utf8);
    col(&mut schema, "planetId", DataType::Int64);
    col(&mut schema, "gm", DataType::Float64);
    col(&mut schema, "radius", DataType::Float64);
    col(&mut schema, "density", DataType::Float64);
    col(&mut schema, "magnitude", DataType::Float64);
    col(&mut schema, "albedo", DataType::Float64);

    // (planetId, named moons, total count for that planet)
    const GROUPS: [(i64, &[&str], usize); 7] = [
        (3, &["Moon"], 1),
        (4, &["Phobos", "Deimos"], 2),
        (5, &[], 79),
        (6, &["Calypso"], 53),
        (7, &[], 27),
        (8, &[], 10),
        (9, &["Charon", "Styx", "Nix", "Kerberos", "Hydra"], 5),
    ];

    let mut rows = Vec::with_capacity(177);
    let mut next_id: i64 = 1;
    for (planet_id, named, count) in GROUPS {
        for slot in 0..count {
            let id = next_id;
            next_id += 1;
            let name = match named.get(slot) {
                Some(s) => s.to_string(),
                None => format!("{planet_id}-{}", slot - named.len() + 1),
            };
            let n = id as f64;
            rows.push(vec![
                ScalarValue::Int64(id),
                ScalarValue::Utf8(name),
                ScalarValue::Int64(planet_id),
                ScalarValue::Float64(n * 4.2),
                ScalarValue::Float64(n * 0.9 + 10.0),
                ScalarValue::Float64(1.0 + (n % 5.0) * 0.3),
                ScalarValue::Float64(20.0 - (n % 10.0)),
                ScalarValue::Float64(0.1 + (n % 9.0) * 0.1),
            ]);
        }
    }

    MemoryTable { schema, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(conn: &MemoryConnector, relation: &str) -> Vec<Morsel> {
        conn.read_dataset(relation, None, &[], false).unwrap().collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn planets_has_nine_rows_and_twenty_columns() {
        let conn = MemoryConnector::new();
        let morsels = read_all(&conn, "$planets");
        assert_eq!(morsels.len(), 1);
        assert_eq!(morsels[0].num_rows(), 9);
        assert_eq!(morsels[0].num_columns(), 20);
    }

    #[test]
    fn satellites_has_177_rows_and_eight_columns() {
        let conn = MemoryConnector::new();
        let morsels = read_all(&conn, "$satellites");
        assert_eq!(morsels[0].num_rows(), 177);
        assert_eq!(morsels[0].num_columns(), 8);
    }

    #[test]
    fn calypso_appears_exactly_once() {
        let conn = MemoryConnector::new();
        let table = conn.table("$satellites").unwrap();
        let name_idx = table.column_index_by_name("name");
        let count = table.rows.iter().filter(|r| r[name_idx] == ScalarValue::Utf8("Calypso".into())).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn seven_distinct_planet_groups_four_over_five() {
        let conn = MemoryConnector::new();
        let table = conn.table("$satellites").unwrap();
        let planet_idx = table.column_index_by_name("planetId");
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for row in &table.rows {
            if let ScalarValue::Int64(p) = &row[planet_idx] {
                *counts.entry(*p).or_insert(0) += 1;
            }
        }
        assert_eq!(counts.len(), 7);
        assert_eq!(counts.values().filter(|&&c| c > 5).count(), 4);
    }

    #[test]
    fn id_in_5_6_7_8_or_name_moon_is_five_rows() {
        let conn = MemoryConnector::new();
        let table = conn.table("$satellites").unwrap();
        let id_idx = table.column_index_by_name("id");
        let name_idx = table.column_index_by_name("name");
        let count = table
            .rows
            .iter()
            .filter(|r| match (&r[id_idx], &r[name_idx]) {
                (ScalarValue::Int64(id), ScalarValue::Utf8(name)) => {
                    matches!(id, 5 | 6 | 7 | 8) || name == "Moon"
                }
                _ => false,
            })
            .count();
        assert_eq!(count, 5);
    }

    #[test]
    fn limit_50_offset_150_is_27_rows() {
        let conn = MemoryConnector::new();
        let table = conn.table("$satellites").unwrap();
        let remaining = table.rows.len().saturating_sub(150).min(50);
        assert_eq!(remaining, 27);
    }

    impl MemoryTable {
        fn column_index_by_name(&self, name: &str) -> usize {
            self.schema.columns.iter().position(|c| c.name == name).unwrap()
        }
    }
}
