use rand::distributions::Alphanumeric;
use rand::prelude::*;

/// One synthetic entity: a canonical product name and the noisy
/// observations the resolver should group back together.
pub struct GeneratedEntity {
    pub canonical: String,
    pub observed: Vec<String>,
}

/// Generates `num_entities` random canonical names with `observations`
/// corrupted copies each. With 24-character names and two substitutions a
/// fuzzy ratio threshold of 70 separates entities cleanly.
pub fn generate_entities(
    rng: &mut StdRng,
    num_entities: usize,
    observations: usize,
    substitutions: usize,
) -> Vec<GeneratedEntity> {
    (0..num_entities)
        .map(|_| {
            let canonical: String = Alphanumeric
                .sample_iter(&mut *rng)
                .take(24)
                .map(char::from)
                .collect();
            let observed = (0..observations)
                .map(|_| corrupt(rng, &canonical, substitutions))
                .collect();
            GeneratedEntity {
                canonical,
                observed,
            }
        })
        .collect()
}

fn corrupt(rng: &mut StdRng, canonical: &str, substitutions: usize) -> String {
    let mut chars: Vec<char> = canonical.chars().collect();
    for _ in 0..substitutions {
        let i = rng.gen_range(0..chars.len());
        chars[i] = char::from(Alphanumeric.sample(rng));
    }
    chars.into_iter().collect()
}
