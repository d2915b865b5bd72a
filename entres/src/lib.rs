/*!
This library implements probabilistic entity resolution: it groups noisy
observed records (references) into clusters, each cluster standing for one
underlying real-world entity.

Pairwise scores are Fellegi-Sunter log-odds over user-configured field
comparators; clustering is greedy agglomeration with a blocking predicate
that prunes implausible comparisons. Two resolvers share the same greedy
core: [`resolver::SerialResolver`] streams references in one at a time,
[`resolver::MergeResolver`] resolves batches in parallel chunks and merges
the partial results pyramidally.

## Example

 ```
 use entres::model::{FieldDef, Reference, Schema};
 use entres::resolver::SerialResolver;

 let schema = Schema::builder()
     .field(FieldDef::new("product_name"))
     .build()
     .unwrap();
 let references: Vec<Reference> = ["acme soap", "acme soap", "zenith tea"]
     .iter()
     .map(|name| {
         Reference::builder(schema.clone())
             .field("product_name", *name)
             .build()
             .unwrap()
     })
     .collect();
 let mut resolver = SerialResolver::new(references);
 resolver.resolve();
 assert_eq!(resolver.clusters().count(), 2);
 ```

## References

[[1] Fellegi, Sunter: A Theory for Record Linkage](https://courses.cs.washington.edu/courses/cse590q/04au/papers/Felligi69.pdf)

 */

pub mod model;
pub mod resolver;
