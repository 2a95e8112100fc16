/*!
# Writing chains back to sampler-style CSV

The output uses the same convention the reader understands: a header of
`name` / `name.i1.i2` labels in column-major order, then one row per
iteration. Enable via the `csv` feature (on by default).
*/

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::chain::Chain;
use crate::error::Result;

/**
Writes `chain` as CSV to `writer`.

Warmup rows are written only if `include_warmup` is set. Warmup and thinning
metadata are not part of the output.

A chain whose schema has a single column is written as-is, but
[`read_chain`](crate::io::read_chain) rejects the result because it requires at
least two header fields.

# Examples

```rust
use mcmc_chains::io::csv::write_chain;
use mcmc_chains::io::read_chain;

let chain = read_chain("lp__,theta.1,theta.2\n-1,0.5,1.5\n".as_bytes())?;
let mut out = Vec::new();
write_chain(&chain, &mut out, false)?;
assert_eq!(String::from_utf8(out).unwrap(), "lp__,theta.1,theta.2\n-1,0.5,1.5\n");
# Ok::<(), mcmc_chains::Error>(())
```
*/
pub fn write_chain<W: Write>(chain: &Chain, writer: W, include_warmup: bool) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(chain.schema().header())?;

    for row in chain.sample_matrix(include_warmup).rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes `chain` to the file at `path`, see [`write_chain`].
pub fn save_chain_csv<P: AsRef<Path>>(chain: &Chain, path: P, include_warmup: bool) -> Result<()> {
    let path = path.as_ref();
    log::info!("writing chain to {}", path.display());
    write_chain(chain, File::create(path)?, include_warmup)
}
