use commonfrags::{
    count_fragments,
    io::{read_dataset, write_table},
    Canonicalizer, Config, FrequencyTable, Native, Report,
};

fn drugs() -> Vec<String> {
    read_dataset("testfiles/drugs.csv", "SMILES").unwrap()
}

fn key(smiles: &str) -> String {
    Native.canonicalize(smiles).unwrap().smiles
}

#[test]
fn empty_input() {
    let table = count_fragments(Vec::<String>::new(), 5).unwrap();
    assert!(table.is_empty());
    assert!(table.ranked().is_empty());
}

#[test]
fn ethanol_is_one_fragment() {
    let table = count_fragments(["CCO"], 0).unwrap();
    let got: Vec<_> = table.iter().collect();
    assert_eq!(got, vec![("CCO", 1)]);
    for (smiles, _) in table.iter() {
        assert!(Native.canonicalize(smiles).unwrap().heavy_atoms > 0);
    }
}

#[test]
fn aspirin() {
    let table = count_fragments(["CC(=O)Oc1ccccc1C(=O)O"], 5).unwrap();
    let top = table.top(3);
    assert!(top.len() <= 3);
    assert_eq!(top, vec![("c1ccccc1", 1)]);
    for pair in top.windows(2) {
        assert!(pair[0].1 >= pair[1].1);
    }

    // everything but the two oxygens between the pieces
    let table = count_fragments(["CC(=O)Oc1ccccc1C(=O)O"], 0).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.get("O"), Some(1));
}

#[test]
fn alternative_labels_count_separately() {
    let table = count_fragments(["COC1(C)CCCCC1"], 0).unwrap();
    assert_eq!(table.top(1), vec![(key("CC1CCCCC1").as_str(), 2)]);
    assert_eq!(table.get(&key("OC")), Some(1));
}

#[test]
fn stereo_is_kept() {
    let trans = count_fragments(["F/C=C/COC"], 2).unwrap();
    let cis = count_fragments(["F/C=C\\COC"], 2).unwrap();
    assert_eq!(trans.get(&key("C/C=C/F")), Some(1));
    assert_eq!(cis.get(&key("C/C=C\\F")), Some(1));
    assert_ne!(trans, cis);
}

#[test]
fn threshold_only_removes() {
    let smiles = drugs();
    let tables: Vec<FrequencyTable> = (-1..=8)
        .map(|m| count_fragments(&smiles, m).unwrap())
        .collect();
    for pair in tables.windows(2) {
        let (low, high) = (&pair[0], &pair[1]);
        assert!(high.len() <= low.len());
        for (smiles, count) in high.iter() {
            assert_eq!(low.get(smiles), Some(count), "{smiles}");
        }
    }
}

#[test]
fn duplicates_double() {
    let once = drugs();
    let twice: Vec<String> = once.iter().chain(&once).cloned().collect();
    let a = count_fragments(&once, 3).unwrap();
    let b = count_fragments(&twice, 3).unwrap();
    assert_eq!(a.len(), b.len());
    for (smiles, count) in a.iter() {
        assert_eq!(b.get(smiles), Some(2 * count));
    }
}

#[test]
fn atom_order_does_not_matter() {
    let a = count_fragments(["CC(=O)Oc1ccccc1C(=O)O"], -1).unwrap();
    let b = count_fragments(["OC(=O)c1ccccc1OC(C)=O"], -1).unwrap();
    let c = count_fragments(["CC(=O)OC1=CC=CC=C1C(O)=O"], -1).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn drug_set() {
    let table = count_fragments(drugs(), 5).unwrap();
    let ranked = table.ranked();
    assert_eq!(ranked[0], (key("c1ccccc1").as_str(), 3));
    assert_eq!(ranked[1], (key("Oc1ccccc1").as_str(), 2));
    assert_eq!(table.get(&key("Nc1ccccc1")), Some(1));
    // nothing in caffeine is a BRICS bond
    assert_eq!(table.get(&key("Cn1c(=O)c2c(ncn2C)n(C)c1=O")), Some(1));
}

#[test]
fn json_dataset() {
    let smiles = read_dataset("testfiles/opt.json", "ignored").unwrap();
    assert_eq!(smiles.len(), 2);
    let table = count_fragments(&smiles, 2).unwrap();
    let want = count_fragments(["CC(=O)Oc1ccccc1C(=O)O", "CCO"], 2).unwrap();
    assert_eq!(table, want);
}

#[test]
fn end_to_end() {
    let config = Config::load("testfiles/config.json").unwrap();
    assert_eq!(config.nfrags, 3);
    let smiles = read_dataset("testfiles/drugs.csv", &config.smiles_column).unwrap();
    let table = count_fragments(&smiles, config.min_heavy_atoms).unwrap();

    let mut csv = Vec::new();
    write_table(&mut csv, &table).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Frag_Smiles,Frag_Frequency"));
    assert_eq!(lines.count(), table.len());

    let report = Report::new(&table, config.nfrags, config.min_heavy_atoms);
    let text = report.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "3 most common fragments that have more heavy atoms than 4:"
    );
    assert_eq!(lines[1], "Fragment SMILE, frequency");
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[2], format!("{}: 3", key("c1ccccc1")));
}
