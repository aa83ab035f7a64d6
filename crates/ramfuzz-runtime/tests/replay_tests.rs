use std::fs;
use std::path::Path;

use ramfuzz_runtime::log::{control_path, index_path, write_control};
use ramfuzz_runtime::{
    spin_roulette, Gen, Harness, LogReader, Make, Mode, RuntimeConfig, RuntimeError, SkipRange,
    Wide,
};

fn seeded(seed: u64) -> RuntimeConfig {
    RuntimeConfig {
        seed: Some(seed),
        max_collection_len: 20,
        ..Default::default()
    }
}

struct Account {
    balance: i64,
    history: Vec<i64>,
}

struct HarnessAccount {
    obj: Account,
}

impl HarnessAccount {
    fn account0(_g: &mut Gen) -> Result<Option<Account>, RuntimeError> {
        Ok(Some(Account {
            balance: 0,
            history: Vec::new(),
        }))
    }

    fn account1(g: &mut Gen) -> Result<Option<Account>, RuntimeError> {
        let balance = g.between(-1000, 1000, 10)?;
        Ok(Some(Account {
            balance,
            history: Vec::new(),
        }))
    }

    fn deposit0(&mut self, g: &mut Gen) -> Result<(), RuntimeError> {
        let amount = g.between(0, 500, 11)?;
        self.obj.balance += amount;
        self.obj.history.push(amount);
        Ok(())
    }

    fn withdraw0(&mut self, g: &mut Gen) -> Result<(), RuntimeError> {
        let amount = g.between(0, 500, 12)?;
        self.obj.balance -= amount;
        self.obj.history.push(-amount);
        Ok(())
    }
}

impl Harness for HarnessAccount {
    type Target = Account;
    const CROULETTE: &'static [fn(&mut Gen) -> Result<Option<Account>, RuntimeError>] =
        &[Self::account0, Self::account1];
    const MROULETTE: &'static [fn(&mut Self, &mut Gen) -> Result<(), RuntimeError>] =
        &[Self::deposit0, Self::withdraw0];

    fn wrap(obj: Account) -> Self {
        Self { obj }
    }

    fn into_target(self) -> Account {
        self.obj
    }
}

/// Everything one exercise run observed.
#[derive(Debug, PartialEq)]
struct Observed {
    ints: Vec<i32>,
    real: f64,
    flag: bool,
    small: Vec<u16>,
    text: String,
    accounts: Vec<(i64, Vec<i64>)>,
}

fn exercise(g: &mut Gen) -> Result<Observed, RuntimeError> {
    let ints = (0..5)
        .map(|i| g.between(-50, 50, i))
        .collect::<Result<Vec<i32>, _>>()?;
    let real = g.any(5)?;
    let flag = g.any(6)?;
    let small = Vec::<u16>::make(g, 7)?;
    let text = String::make(g, 8)?;
    let mut accounts = Vec::new();
    for _ in 0..4 {
        if let Some(h) = spin_roulette::<HarnessAccount>(g)? {
            accounts.push((h.obj.balance, h.obj.history));
        }
    }
    Ok(Observed {
        ints,
        real,
        flag,
        small,
        text,
        accounts,
    })
}

fn record(path: &Path, seed: u64) -> Observed {
    let mut g = Gen::generate(path, seeded(seed)).unwrap();
    let observed = exercise(&mut g).unwrap();
    g.finish(true).unwrap();
    observed
}

#[test]
fn test_replay_reproduces_every_value() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    let original = record(&first, 1);

    // A different seed must not matter.
    let mut g = Gen::replay(&first, &second, seeded(2)).unwrap();
    assert_eq!(g.mode(), Mode::Replay);
    let replayed = exercise(&mut g).unwrap();
    g.finish(true).unwrap();

    assert_eq!(replayed, original);
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    assert_eq!(
        fs::read_to_string(index_path(&first)).unwrap(),
        fs::read_to_string(index_path(&second)).unwrap()
    );
}

#[test]
fn test_same_seed_same_run() {
    let dir = tempfile::tempdir().unwrap();
    let a = record(&dir.path().join("a"), 9);
    let b = record(&dir.path().join("b"), 9);
    assert_eq!(a, b);
}

#[test]
fn test_replay_past_end_fails() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    record(&first, 3);
    let mut g = Gen::replay(&first, dir.path().join("again"), seeded(3)).unwrap();
    exercise(&mut g).unwrap();
    assert!(matches!(
        g.between(0u8, 9, 99),
        Err(RuntimeError::LogExhausted { .. })
    ));
}

#[test]
fn test_replay_checks_type_tags() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    record(&first, 4);
    let mut g = Gen::replay(&first, dir.path().join("again"), seeded(4)).unwrap();
    // The log starts with an i32.
    assert!(matches!(
        g.between(0u8, 9, 0),
        Err(RuntimeError::TagMismatch {
            offset: 0,
            expected: 2,
            found: 5
        })
    ));
}

#[test]
fn test_missing_input_log_is_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Gen::replay(dir.path().join("absent"), dir.path().join("out"), seeded(1))
        .err()
        .unwrap();
    assert!(matches!(err, RuntimeError::File { .. }));
    assert!(err.to_string().contains("absent"));
}

#[test]
fn test_log_records_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log");
    let mut g = Gen::generate(&path, seeded(6)).unwrap();
    let x: i16 = g.between(-3, -3, 40).unwrap();
    let y: f32 = g.between(0.5, 0.5, 41).unwrap();
    g.finish(true).unwrap();
    assert_eq!((x, y), (-3, 0.5));

    let mut reader = LogReader::open(&path).unwrap();
    let first = reader.next_record().unwrap().unwrap();
    assert_eq!((first.offset, first.tag), (0, 3));
    assert_eq!(first.value, Wide::I64(-3));
    assert_eq!(first.valueid, 40);
    let second = reader.next_record().unwrap().unwrap();
    assert_eq!((second.offset, second.tag), (11, 11));
    assert_eq!(second.value, Wide::F64(0.5));
    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(fs::read_to_string(index_path(&path)).unwrap(), "0|11\n1|24\n");
}

// ── Selective replay ─────────────────────────────────────────────────

/// One value, a three-value region, one value.
fn bracketed(g: &mut Gen) -> Result<(u64, Vec<u64>, u64), RuntimeError> {
    let before = g.any(0)?;
    let region = g.begin_region()?;
    let mut inside = Vec::new();
    for _ in 0..3 {
        inside.push(g.between_in(&region, 0, u64::MAX, 1)?);
    }
    g.end_region(region)?;
    let after = g.any(2)?;
    Ok((before, inside, after))
}

#[test]
fn test_control_file_regenerates_region() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let mut g = Gen::generate(&first, seeded(10)).unwrap();
    let (before, inside, after) = bracketed(&mut g).unwrap();
    g.finish(true).unwrap();

    // Each record is 17 bytes: tag, u64 value, u64 id.
    assert_eq!(
        fs::read_to_string(index_path(&first)).unwrap(),
        "0|17\n1{17\n1}68\n2|85\n"
    );

    write_control(&control_path(&first), &[SkipRange { start: 17, end: 68 }]).unwrap();
    let mut g = Gen::replay(&first, dir.path().join("second"), seeded(11)).unwrap();
    let (before2, inside2, after2) = bracketed(&mut g).unwrap();
    g.finish(true).unwrap();

    assert_eq!(before2, before);
    assert_ne!(inside2, inside);
    assert_eq!(after2, after);
}

#[test]
fn test_regenerated_region_may_change_length() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let mut g = Gen::generate(&first, seeded(12)).unwrap();
    Vec::<u8>::make(&mut g, 0).unwrap();
    let tail: i32 = g.any(1).unwrap();
    assert_eq!(g.log_path(), first.as_path());
    g.finish(true).unwrap();

    // The vector's region spans from offset 0 to just before the tail.
    let tail_offset = fs::metadata(&first).unwrap().len() - 13;
    write_control(
        &control_path(&first),
        &[SkipRange {
            start: 0,
            end: tail_offset,
        }],
    )
    .unwrap();
    let mut g = Gen::replay(&first, dir.path().join("second"), seeded(13)).unwrap();
    let regenerated = Vec::<u8>::make(&mut g, 0).unwrap();
    let tail2: i32 = g.any(1).unwrap();
    assert_eq!(tail2, tail);
    assert!(regenerated.len() <= 20);
}
