use canvalytics_core::{Column, ColumnData, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{LoadError, LoadResult};

/// Names accepted by [`sample_table`].
pub const SAMPLES: &[&str] = &["titanic"];

const TITANIC_ROWS: usize = 891;
const SEED: u64 = 42;

/// Build a bundled sample dataset by name (case-insensitive).
pub fn sample_table(name: &str) -> LoadResult<Table> {
    match name.trim().to_lowercase().as_str() {
        "titanic" => titanic(TITANIC_ROWS, SEED),
        other => Err(LoadError::UnsupportedFormat(format!(
            "unknown sample dataset '{other}', expected one of: {}",
            SAMPLES.join(", ")
        ))),
    }
}

/// Weighted choice; `weights` need not sum to one.
fn choose<T: Copy>(rng: &mut StdRng, options: &[(T, f64)]) -> T {
    let total: f64 = options.iter().map(|(_, w)| w).sum();
    let mut draw = rng.gen::<f64>() * total;
    for &(value, weight) in options {
        if draw < weight {
            return value;
        }
        draw -= weight;
    }
    options[options.len() - 1].0
}

fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    // Box-Muller
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + z * std
}

/// Synthetic passenger list shaped like the Titanic manifest.
///
/// Survival odds rise for women, first class, children and small families.
/// About a fifth of ages and most cabins are missing.
fn titanic(n: usize, seed: u64) -> LoadResult<Table> {
    const MALE: &[&str] = &["John", "William", "James", "Charles", "George", "Frank", "Joseph", "Thomas", "Henry", "Robert"];
    const FEMALE: &[&str] = &["Mary", "Anna", "Margaret", "Helen", "Elizabeth", "Ruth", "Florence", "Ethel", "Emma", "Marie"];
    const SURNAMES: &[&str] = &["Smith", "Johnson", "Williams", "Brown", "Jones", "Miller", "Davis", "Garcia", "Rodriguez", "Wilson"];

    let mut rng = StdRng::seed_from_u64(seed);
    let mut id = Vec::with_capacity(n);
    let mut survived = Vec::with_capacity(n);
    let mut pclass = Vec::with_capacity(n);
    let mut name = Vec::with_capacity(n);
    let mut sex = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut sibsp = Vec::with_capacity(n);
    let mut parch = Vec::with_capacity(n);
    let mut ticket = Vec::with_capacity(n);
    let mut fare = Vec::with_capacity(n);
    let mut cabin = Vec::with_capacity(n);
    let mut embarked = Vec::with_capacity(n);

    for i in 0..n {
        let class: i64 = choose(&mut rng, &[(1, 0.24), (2, 0.21), (3, 0.55)]);
        let female = rng.gen_bool(0.35);
        let years = normal(&mut rng, 29.0, 14.0).clamp(0.17, 80.0);
        let siblings: i64 = choose(&mut rng, &[(0, 0.68), (1, 0.23), (2, 0.06), (3, 0.02), (4, 0.005), (5, 0.003), (8, 0.002)]);
        let parents: i64 = choose(&mut rng, &[(0, 0.76), (1, 0.13), (2, 0.08), (3, 0.02), (4, 0.004), (5, 0.003), (6, 0.003)]);
        let price = normal(&mut rng, 2.5, 1.2).exp();
        let port = choose(&mut rng, &[("S", 0.72), ("C", 0.19), ("Q", 0.09)]);

        let mut p: f64 = 0.3;
        p += if female { 0.4 } else { -0.1 };
        p += match class {
            1 => 0.3,
            2 => 0.1,
            _ => -0.1,
        };
        if years < 16.0 {
            p += 0.2;
        } else if years > 60.0 {
            p -= 0.1;
        }
        let family = siblings + parents;
        if (1..=3).contains(&family) {
            p += 0.1;
        } else if family > 3 {
            p -= 0.1;
        }
        let lived = rng.gen_bool(p.clamp(0.0, 1.0));

        let (first, title) = if female {
            let title = if rng.gen_bool(0.6) { "Miss." } else { "Mrs." };
            (FEMALE[rng.gen_range(0..FEMALE.len())], title)
        } else {
            (MALE[rng.gen_range(0..MALE.len())], "Mr.")
        };
        let surname = SURNAMES[rng.gen_range(0..SURNAMES.len())];
        let ticket_no = if rng.gen_bool(0.3) {
            format!("A/{}", rng.gen_range(10_000..99_999))
        } else {
            rng.gen_range(100_000..999_999).to_string()
        };
        let cabin_no = rng.gen_bool(0.23).then(|| {
            let deck = ['A', 'B', 'C', 'D', 'E', 'F', 'G'][rng.gen_range(0..7)];
            format!("{deck}{}", rng.gen_range(1..200))
        });
        let age_known = !rng.gen_bool(0.2);

        id.push(Some(i as i64 + 1));
        survived.push(Some(i64::from(lived)));
        pclass.push(Some(class));
        name.push(Some(format!("{surname}, {title} {first}")));
        sex.push(Some(if female { "female" } else { "male" }.to_string()));
        age.push(age_known.then(|| (years * 10.0).round() / 10.0));
        sibsp.push(Some(siblings));
        parch.push(Some(parents));
        ticket.push(Some(ticket_no));
        fare.push(Some((price * 100.0).round() / 100.0));
        cabin.push(cabin_no);
        embarked.push(Some(port.to_string()));
    }

    Ok(Table::new(vec![
        Column::new("PassengerId", ColumnData::Integer(id)),
        Column::new("Survived", ColumnData::Integer(survived)),
        Column::new("Pclass", ColumnData::Integer(pclass)),
        Column::new("Name", ColumnData::Categorical(name)),
        Column::new("Sex", ColumnData::Categorical(sex)),
        Column::new("Age", ColumnData::Float(age)),
        Column::new("SibSp", ColumnData::Integer(sibsp)),
        Column::new("Parch", ColumnData::Integer(parch)),
        Column::new("Ticket", ColumnData::Categorical(ticket)),
        Column::new("Fare", ColumnData::Float(fare)),
        Column::new("Cabin", ColumnData::Categorical(cabin)),
        Column::new("Embarked", ColumnData::Categorical(embarked)),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvalytics_core::DType;

    #[test]
    fn test_titanic_shape() {
        let table = sample_table("Titanic").unwrap();
        assert_eq!(table.n_rows(), 891);
        assert_eq!(table.n_columns(), 12);
        assert_eq!(table.column("Survived").unwrap().dtype(), DType::Integer);
        assert_eq!(table.column("Age").unwrap().dtype(), DType::Float);

        let age_missing = table.column("Age").unwrap().missing_count();
        assert!(age_missing > 100 && age_missing < 260, "{age_missing}");
        assert!(table.column("Cabin").unwrap().missing_count() > 600);
    }

    #[test]
    fn test_women_survive_more() {
        let table = sample_table("titanic").unwrap();
        let sex = table.column("Sex").unwrap();
        let survived = table.column("Survived").unwrap();
        let rate = |who: &str| {
            let rows: Vec<usize> = (0..table.n_rows())
                .filter(|&r| sex.text_at(r).as_deref() == Some(who))
                .collect();
            let lived = rows.iter().filter(|&&r| survived.f64_at(r) == Some(1.0)).count();
            lived as f64 / rows.len() as f64
        };
        assert!(rate("female") > rate("male") + 0.2);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sample_table("titanic").unwrap(), sample_table("titanic").unwrap());
    }

    #[test]
    fn test_unknown_sample() {
        assert!(matches!(sample_table("iris"), Err(LoadError::UnsupportedFormat(_))));
    }
}
