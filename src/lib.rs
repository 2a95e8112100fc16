/*!
# mcmc-chains

Turns the flat CSV output of an MCMC sampler into named, multi-dimensional
chains.

A header such as `lp__,mu,theta.1.1,theta.2.1,theta.1.2,theta.2.2` is parsed
into an [`IndexSchema`] (`lp__` and `mu` scalars, `theta` a 2x2 array stored
column-major), and the rows below it into a [`Chain`] that can be sliced by
variable name and iteration range.

```rust
use mcmc_chains::read_chain;

let input = "\
## comments are skipped
lp__,theta.1.1,theta.2.1,theta.1.2,theta.2.2
-7.1,1,2,3,4
-6.9,5,6,7,8
";
let chain = read_chain(input.as_bytes())?;
let theta = chain.variable("theta")?;
assert_eq!(theta.shape(), &[2, 2, 2]);
assert_eq!(theta[[1, 0, 1]], 7.0);
# Ok::<(), mcmc_chains::Error>(())
```
*/

pub mod chain;
pub mod dims;
pub mod error;
pub mod io;
pub mod names;
pub mod schema;

pub use chain::{Chain, Thinning};
pub use error::{Error, Result};
pub use io::{read_chain, read_chain_file, ChainReader};
pub use schema::{IndexSchema, Label, Record, Shape};
