//! Result output: one tab-separated line per returned document.

use crate::query::{QueryOutput, TopKEntry};
use std::io::{self, Write};

/// Print a query's top-k as `qid<TAB>rank<TAB>docid<TAB>score` lines
pub fn print_topk<W: Write>(out: &mut W, query_id: &str, results: &[TopKEntry]) -> io::Result<()> {
    for (rank, entry) in results.iter().enumerate() {
        writeln!(
            out,
            "{}\t{}\t{}\t{:.6}",
            query_id,
            rank + 1,
            entry.docid,
            entry.score
        )?;
    }
    Ok(())
}

/// Print whatever a strategy produced for one query
pub fn print_output<W: Write>(out: &mut W, query_id: &str, output: &QueryOutput) -> io::Result<()> {
    match output {
        QueryOutput::Count(count) => writeln!(out, "{}\t{}", query_id, count),
        QueryOutput::Ranked(results) => print_topk(out, query_id, results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topk_lines() {
        let results = vec![
            TopKEntry {
                score: 2.5,
                docid: 7,
            },
            TopKEntry {
                score: 1.0,
                docid: 3,
            },
        ];
        let mut out = Vec::new();
        print_topk(&mut out, "q1", &results).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "q1\t1\t7\t2.500000\nq1\t2\t3\t1.000000\n"
        );
    }

    #[test]
    fn test_count_line() {
        let mut out = Vec::new();
        print_output(&mut out, "q2", &QueryOutput::Count(14)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "q2\t14\n");
    }
}
