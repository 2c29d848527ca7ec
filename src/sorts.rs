use radsort::sort_by_key;
use rustc_hash::FxHashMap;

/// Sort by `(start, end)`. radsort is stable, so sort on the minor key first.
pub fn sort_by_coordinates<R, S, E>(items: &mut [R], start: S, end: E)
where
    S: FnMut(&R) -> i64,
    E: FnMut(&R) -> i64,
{
    sort_by_key(items, end);
    sort_by_key(items, start);
}

/// Split records into per-contig groups, in order of first appearance.
pub fn group_by_contig<R, F>(records: Vec<R>, contig_of: F) -> Vec<(String, Vec<R>)>
where
    F: Fn(&R) -> &str,
{
    let mut groups: Vec<(String, Vec<R>)> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for record in records {
        let contig = contig_of(&record);
        let slot = match index.get(contig) {
            Some(&slot) => slot,
            None => {
                let slot = groups.len();
                index.insert(contig.to_string(), slot);
                groups.push((contig.to_string(), Vec::new()));
                slot
            }
        };
        groups[slot].1.push(record);
    }

    groups
}

/// First `chr[0-9XY]+` token in a contig name, e.g. `chr21` in
/// `HG00096_rc-chr21_haplotype1-0000001`.
pub fn chrom_name(contig: &str) -> Option<&str> {
    for (idx, _) in contig.match_indices("chr") {
        let rest = &contig[idx + 3..];
        let len = rest
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b'X' || *b == b'Y')
            .count();
        if len > 0 {
            return Some(&contig[idx..idx + 3 + len]);
        }
    }
    None
}

/// Chromosome number for output ordering: autosomes by number, X = 23,
/// Y = 24, anything else last.
pub fn chrom_sort_key(contig: &str) -> u32 {
    let Some(chrom) = chrom_name(contig) else {
        return u32::MAX;
    };
    match &chrom[3..] {
        "X" => 23,
        "Y" => 24,
        num => num.parse().unwrap_or(u32::MAX),
    }
}
