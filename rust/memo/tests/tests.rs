use memo::{
    FeatureTable,
    MemoAnalysis,
    MemoError,
    MemoMatrix,
    Software,
    SpectraDocuments,
    SpectraFile,
    Spectrum,
    TableKind,
};
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("memo_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

const QUANT: &str = "\
row ID,row m/z,X Peak area,Y Peak area,Z Peak area
1,338.342,1200,310,0
2,278.19,0,0,4500
";

fn write_spectra(path: &PathBuf) {
    let spectra = [
        Spectrum::new("1", 338.342, vec![(100.0, 1.0), (100.001, 0.5)], vec![]),
        Spectrum::new("2", 278.19, vec![], vec![(50.0, 1.0)]),
    ];
    let text = spectra
        .iter()
        .map(|s| serde_json::to_string(s).unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(path, text).unwrap();
}

#[test]
fn test_build_from_files() {
    let dir = scratch_dir("build_from_files");
    let quant_path = dir.join("quant.csv");
    let spectra_path = dir.join("spectra.ndjson");
    std::fs::write(&quant_path, QUANT).unwrap();
    write_spectra(&spectra_path);

    let features = FeatureTable::from_path(&quant_path, Software::Mzmine).unwrap();
    let documents = SpectraDocuments::from_source(&SpectraFile::new(&spectra_path), 2).unwrap();
    let analysis = MemoAnalysis::build(features, &documents).unwrap();
    let matrix = analysis.memo_matrix();

    assert_eq!(matrix.samples(), &["X", "Y", "Z"].map(String::from));
    assert_eq!(
        matrix.tokens(),
        &["peak@100.00", "loss@50.00"].map(String::from)
    );
    assert_eq!(
        matrix.table().to_rows(),
        vec![vec![2.0, 0.0], vec![2.0, 0.0], vec![0.0, 1.0]]
    );

    let out = dir.join("memo_matrix.csv");
    analysis.export(TableKind::MemoMatrix, &out, b',').unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        text.lines().next().unwrap(),
        "filename,peak@100.00,loss@50.00"
    );
    assert_eq!(text.lines().nth(1).unwrap(), "X,2,0");

    let back = MemoMatrix::from_path(&out, b',').unwrap();
    assert_eq!(&back, matrix);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_blank_removal_then_merge() {
    let batch_a = MemoMatrix::new(
        memo::LabeledTable::from_rows(
            vec![
                "blank_1".into(),
                "blank_2".into(),
                "a1".into(),
                "a2".into(),
                "a3".into(),
            ],
            vec!["peak@10.00".into(), "peak@20.00".into(), "loss@5.00".into()],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![2.0, 0.0, 0.0],
                vec![0.0, 1.0, 3.0],
                vec![0.0, 2.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )
        .unwrap(),
    );
    let filtered = batch_a.filter("BLANK", Some(0)).unwrap();
    assert_eq!(filtered.samples(), &["a1", "a2", "a3"].map(String::from));
    assert_eq!(
        filtered.tokens(),
        &["peak@20.00", "loss@5.00"].map(String::from)
    );

    let batch_b = MemoMatrix::new(
        memo::LabeledTable::from_rows(
            vec!["b1".into()],
            vec!["loss@5.00".into(), "peak@30.00".into()],
            vec![vec![4.0, 1.0]],
        )
        .unwrap(),
    );
    let union = filtered.merge(&batch_b, false);
    assert_eq!(union.samples().len(), 4);
    assert_eq!(
        union.tokens(),
        &["peak@20.00", "loss@5.00", "peak@30.00"].map(String::from)
    );
    assert_eq!(union.count("b1", "peak@20.00"), Some(0.0));
    assert_eq!(union.count("a1", "peak@30.00"), Some(0.0));

    let common = filtered.merge(&batch_b, true);
    assert_eq!(common.tokens(), &["loss@5.00".to_string()]);
    assert_eq!(common.count("b1", "loss@5.00"), Some(4.0));
}

#[test]
fn test_non_numeric_spectrum_id_fails() {
    let dir = scratch_dir("non_numeric_id");
    let spectra_path = dir.join("spectra.ndjson");
    std::fs::write(
        &spectra_path,
        r#"{"scans": "FT0001", "precursor_mz": 100.0, "peaks": [[50.0, 1.0]]}"#,
    )
    .unwrap();
    let res = SpectraDocuments::from_source(&SpectraFile::new(&spectra_path), 2);
    assert!(matches!(res, Err(MemoError::Data { .. })));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_numeric_spectrum_ids_are_accepted() {
    let dir = scratch_dir("numeric_id");
    let spectra_path = dir.join("spectra.ndjson");
    std::fs::write(
        &spectra_path,
        r#"{"scans": 1, "precursor_mz": 100.0, "peaks": [[50.0, 1.0]]}"#,
    )
    .unwrap();
    let documents = SpectraDocuments::from_source(&SpectraFile::new(&spectra_path), 2).unwrap();
    assert_eq!(documents.get(1).unwrap().words(), &["peak@50.00"]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_file_reports_path() {
    let res = FeatureTable::from_path("/nonexistent/quant.csv", Software::Mzmine);
    match res {
        Err(MemoError::Io { path, .. }) => {
            assert_eq!(path, Some(PathBuf::from("/nonexistent/quant.csv")))
        }
        other => panic!("expected an io error, got {:?}", other),
    }
}
