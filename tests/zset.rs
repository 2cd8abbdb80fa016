use std::ops::Bound;

use skiplist::GeometricalLevelGenerator;
use sortedset::{parse_bound, OperationError, SortedSet};

macro_rules! zadd {
    ($value: expr, $score: expr, $member: expr) => {
        $value.zadd($score, $member.clone(), false, false, false, false).unwrap()
    };
}

fn zset() -> SortedSet {
    let mut zset = SortedSet::with_level_generator(GeometricalLevelGenerator::with_seed(32, 0.25, 11));
    zset.set_verify_invariants(true);
    zset
}

#[test]
fn zadd_basic() {
    let mut value = zset();
    let s1 = 1.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 1.0;
    let v2 = vec![5, 6, 7, 8];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(zadd!(value, s1, v1), false);
    assert_eq!(zadd!(value, s2, v2), true);
    assert_eq!(zadd!(value, s1, v2), false);
    assert_eq!(value.zscore(&v1), Some(s1));
    assert_eq!(value.zscore(&v2), Some(s1));
    assert_eq!(value.zcard(), 2);
}

#[test]
fn zadd_nx() {
    let mut value = zset();
    let s1 = 1.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 2.0;
    let v2 = vec![5, 6, 7, 8];

    assert_eq!(value.zadd(s1, v1.clone(), true, false, false, false).unwrap(), true);
    assert_eq!(value.zadd(s2, v1.clone(), true, false, false, false).unwrap(), false);
    assert_eq!(value.zadd(s2, v2.clone(), true, false, false, false).unwrap(), true);
    assert_eq!(value.zadd(s1, v2.clone(), true, false, false, false).unwrap(), false);
    assert_eq!(value.zscore(&v1), Some(s1));
    assert_eq!(value.zscore(&v2), Some(s2));
}

#[test]
fn zadd_xx() {
    let mut value = zset();
    let s1 = 1.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 2.0;

    assert_eq!(value.zadd(s1, v1.clone(), false, true, false, false).unwrap(), false);
    assert_eq!(value.zcard(), 0);
    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(value.zadd(s2, v1.clone(), false, true, false, false).unwrap(), false);
    assert_eq!(value.zscore(&v1), Some(s2));
}

#[test]
fn zadd_ch() {
    let mut value = zset();
    let s1 = 1.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 2.0;

    assert_eq!(value.zadd(s1, v1.clone(), false, false, true, false).unwrap(), true);
    assert_eq!(zadd!(value, s1, v1), false);
    assert_eq!(value.zadd(s1, v1.clone(), false, false, true, false).unwrap(), false);
    assert_eq!(value.zadd(s2, v1.clone(), false, false, true, false).unwrap(), true);
    assert_eq!(value.zscore(&v1), Some(s2));
}

#[test]
fn zadd_nan() {
    let mut value = zset();
    match value.zadd(std::f64::NAN, b"a".to_vec(), false, false, false, false) {
        Err(OperationError::ValueError) => (),
        other => panic!("expected a value error, got {:?}", other),
    }
    zadd!(value, std::f64::INFINITY, b"a".to_vec());
    match value.zadd(std::f64::NEG_INFINITY, b"a".to_vec(), false, false, false, true) {
        Err(OperationError::ValueError) => (),
        other => panic!("expected a value error, got {:?}", other),
    }
    assert_eq!(value.zscore(b"a"), Some(std::f64::INFINITY));
    value.check().unwrap();
}

#[test]
fn zcount() {
    let mut value = zset();
    let s1 = 1.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 2.0;
    let v2 = vec![5, 6, 7, 8];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(zadd!(value, s2, v2), true);
    assert_eq!(value.zcount(Bound::Included(0.0), Bound::Included(5.0)).unwrap(), 2);
    assert_eq!(value.zcount(Bound::Included(1.0), Bound::Included(2.0)).unwrap(), 2);
    assert_eq!(value.zcount(Bound::Excluded(1.0), Bound::Excluded(2.0)).unwrap(), 0);
    assert_eq!(value.zcount(Bound::Included(1.5), Bound::Included(2.0)).unwrap(), 1);
    assert_eq!(value.zcount(Bound::Included(5.0), Bound::Included(10.0)).unwrap(), 0);
    assert!(value.zcount(Bound::Included(std::f64::NAN), Bound::Unbounded).is_err());
}

#[test]
fn zrange() {
    let mut value = zset();
    let s1 = 0.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 0.0;
    let v2 = vec![5, 6, 7, 8];
    let s3 = 0.0;
    let v3 = vec![9, 10, 11, 12];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(zadd!(value, s3, v3), true);
    assert_eq!(zadd!(value, s2, v2), true);
    assert_eq!(value.zrange(0, -1, true, false), vec![
            vec![1, 2, 3, 4], b"0".to_vec(),
            vec![5, 6, 7, 8], b"0".to_vec(),
            vec![9, 10, 11, 12], b"0".to_vec(),
            ]);
    assert_eq!(value.zrange(1, 1, true, false), vec![
            vec![5, 6, 7, 8], b"0".to_vec(),
            ]);
    assert_eq!(value.zrange(2, 0, true, false).len(), 0);
    assert_eq!(value.zrange(0, 0, false, true), vec![vec![9, 10, 11, 12]]);
    assert_eq!(value.zrange(-2, -1, false, true), vec![vec![5, 6, 7, 8], vec![1, 2, 3, 4]]);
    assert_eq!(value.zrange(5, 10, false, false).len(), 0);
}

#[test]
fn zrangebyscore() {
    let mut value = zset();
    let s1 = 10.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 20.0;
    let v2 = vec![5, 6, 7, 8];
    let s3 = 30.0;
    let v3 = vec![9, 10, 11, 12];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(zadd!(value, s3, v3), true);
    assert_eq!(zadd!(value, s2, v2), true);
    assert_eq!(value.zrangebyscore(Bound::Unbounded, Bound::Unbounded, true, 0, usize::MAX, false).unwrap(), vec![
            vec![1, 2, 3, 4], b"10".to_vec(),
            vec![5, 6, 7, 8], b"20".to_vec(),
            vec![9, 10, 11, 12], b"30".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Excluded(10.0), Bound::Included(20.0), true, 0, usize::MAX, false).unwrap(), vec![
            vec![5, 6, 7, 8], b"20".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Included(20.0), Bound::Excluded(30.0), true, 0, usize::MAX, false).unwrap(), vec![
            vec![5, 6, 7, 8], b"20".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Unbounded, Bound::Unbounded, true, 1, 1, false).unwrap(), vec![
            vec![5, 6, 7, 8], b"20".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Unbounded, Bound::Unbounded, false, 3, 1, false).unwrap().len(), 0);
    assert_eq!(value.zrangebyscore(Bound::Excluded(30.0), Bound::Included(20.0), false, 0, usize::MAX, false).unwrap().len(), 0);
    assert_eq!(value.zrangebyscore(Bound::Excluded(30.0), Bound::Excluded(30.0), false, 0, usize::MAX, false).unwrap().len(), 0);
    assert_eq!(value.zrangebyscore(Bound::Included(30.0), Bound::Included(30.0), false, 0, usize::MAX, false).unwrap().len(), 1);
    assert_eq!(value.zrangebyscore(Bound::Included(30.0), Bound::Excluded(30.0), false, 0, usize::MAX, false).unwrap().len(), 0);
    assert_eq!(value.zrangebyscore(Bound::Included(21.0), Bound::Included(22.0), false, 0, usize::MAX, false).unwrap().len(), 0);
}

#[test]
fn zrevrangebyscore() {
    let mut value = zset();
    let s1 = 10.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 20.0;
    let v2 = vec![5, 6, 7, 8];
    let s3 = 30.0;
    let v3 = vec![9, 10, 11, 12];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(zadd!(value, s3, v3), true);
    assert_eq!(zadd!(value, s2, v2), true);
    assert_eq!(value.zrangebyscore(Bound::Unbounded, Bound::Unbounded, true, 0, usize::MAX, true).unwrap(), vec![
            vec![9, 10, 11, 12], b"30".to_vec(),
            vec![5, 6, 7, 8], b"20".to_vec(),
            vec![1, 2, 3, 4], b"10".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Included(20.0), Bound::Excluded(10.0), true, 0, usize::MAX, true).unwrap(), vec![
            vec![5, 6, 7, 8], b"20".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Excluded(30.0), Bound::Included(20.0), true, 0, usize::MAX, true).unwrap(), vec![
            vec![5, 6, 7, 8], b"20".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Unbounded, Bound::Unbounded, true, 1, 1, true).unwrap(), vec![
            vec![5, 6, 7, 8], b"20".to_vec(),
            ]);
    assert_eq!(value.zrangebyscore(Bound::Unbounded, Bound::Unbounded, false, 1, 5, true).unwrap(), vec![
            vec![5, 6, 7, 8],
            vec![1, 2, 3, 4],
            ]);
    assert_eq!(value.zrangebyscore(Bound::Included(20.0), Bound::Excluded(30.0), false, 0, usize::MAX, true).unwrap().len(), 0);
    assert_eq!(value.zrangebyscore(Bound::Excluded(30.0), Bound::Excluded(30.0), false, 0, usize::MAX, true).unwrap().len(), 0);
    assert_eq!(value.zrangebyscore(Bound::Included(30.0), Bound::Included(30.0), false, 0, usize::MAX, true).unwrap().len(), 1);
    assert_eq!(value.zrangebyscore(Bound::Excluded(30.0), Bound::Included(30.0), false, 0, usize::MAX, true).unwrap().len(), 0);
    assert_eq!(value.zrangebyscore(Bound::Included(22.0), Bound::Included(21.0), false, 0, usize::MAX, true).unwrap().len(), 0);
}

#[test]
fn zrank() {
    let mut value = zset();
    let s1 = 0.0;
    let v1 = vec![1, 2, 3, 4];
    let s2 = 0.0;
    let v2 = vec![5, 6, 7, 8];
    let v3 = vec![9, 10, 11, 12];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(zadd!(value, s2, v2), true);
    assert_eq!(value.zrank(&v1), Some(0));
    assert_eq!(value.zrank(&v2), Some(1));
    assert_eq!(value.zrank(&v3), None);
    assert_eq!(value.zrevrank(&v1), Some(1));
    assert_eq!(value.zrevrank(&v2), Some(0));
    assert_eq!(value.zrevrank(&v3), None);
}

#[test]
fn zadd_update() {
    let mut value = zset();
    let s1 = 0.0;
    let s2 = 1.0;
    let v1 = vec![1, 2, 3, 4];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(zadd!(value, s2, v1), false);
    assert_eq!(value.zrange(0, -1, true, false), vec![
            vec![1, 2, 3, 4], b"1".to_vec(),
            ]);
}

#[test]
fn zadd_update_keeps_ranks() {
    let mut value = zset();
    for i in 0..100u8 {
        zadd!(value, i as f64, vec![i]);
    }
    // every other member jumps to the far end
    for i in (0..100u8).step_by(2) {
        zadd!(value, 1000.0 + i as f64, vec![i]);
    }
    for i in 0..50u8 {
        assert_eq!(value.zrank(&[i * 2 + 1]), Some(i as usize));
        assert_eq!(value.zrank(&[i * 2]), Some(50 + i as usize));
    }
    value.check().unwrap();
}

#[test]
fn zadd_incr() {
    let mut value = zset();
    let s1 = 1.0;
    let incr = 2.0;
    let v1 = vec![1, 2, 3, 4];

    assert_eq!(value.zadd(s1, v1.clone(), false, false, false, true).unwrap(), true);
    assert_eq!(value.zrange(0, -1, true, false), vec![v1.clone(), b"1".to_vec()]);
    assert_eq!(value.zadd(incr, v1.clone(), false, false, false, true).unwrap(), false);
    assert_eq!(value.zrange(0, -1, true, false), vec![v1.clone(), b"3".to_vec()]);
}

#[test]
fn zadd_incr_ch() {
    let mut value = zset();
    let s1 = 1.0;
    let incr = 2.0;
    let v1 = vec![1, 2, 3, 4];

    assert_eq!(value.zadd(s1, v1.clone(), false, false, true, true).unwrap(), true);
    assert_eq!(value.zrange(0, -1, true, false), vec![v1.clone(), b"1".to_vec()]);
    assert_eq!(value.zadd(incr, v1.clone(), false, false, true, true).unwrap(), true);
    assert_eq!(value.zrange(0, -1, true, false), vec![v1.clone(), b"3".to_vec()]);
}

#[test]
fn zrem() {
    let mut value = zset();
    let s1 = 0.0;
    let v1 = vec![1, 2, 3, 4];

    assert_eq!(zadd!(value, s1, v1), true);
    assert_eq!(value.zrem(&[8u8]).unwrap(), false);
    assert_eq!(value.zrem(&v1).unwrap(), true);
    assert_eq!(value.zrem(&v1).unwrap(), false);
    assert_eq!(value.zcard(), 0);
}

#[test]
fn zincrby() {
    let mut value = zset();
    let s1 = 1.0;
    let s2 = 2.0;
    let v1 = vec![1, 2, 3, 4];

    assert_eq!(value.zincrby(s1, v1.clone()).unwrap(), s1);
    assert_eq!(value.zincrby(s2, v1.clone()).unwrap(), s1 + s2);
    assert_eq!(value.zincrby(-s1, v1.clone()).unwrap(), s2);
    assert!(value.zincrby(std::f64::NAN, v1.clone()).is_err());
    assert_eq!(value.zscore(&v1), Some(s2));
}

#[test]
fn zany() {
    let mut value = zset();
    assert!(!value.zany(Bound::Unbounded, Bound::Unbounded).unwrap());
    zadd!(value, 1.0, b"a".to_vec());
    zadd!(value, 5.0, b"b".to_vec());
    zadd!(value, 9.0, b"c".to_vec());
    assert!(value.zany(Bound::Included(5.0), Bound::Included(5.0)).unwrap());
    assert!(!value.zany(Bound::Excluded(5.0), Bound::Excluded(5.0)).unwrap());
    assert!(!value.zany(Bound::Included(10.0), Bound::Included(20.0)).unwrap());
    // the test only compares the interval against the extremes
    assert!(value.zany(Bound::Included(6.0), Bound::Included(8.0)).unwrap());
    assert_eq!(value.zcount(Bound::Included(6.0), Bound::Included(8.0)).unwrap(), 0);
}

#[test]
fn parsed_bounds() {
    let mut value = zset();
    zadd!(value, 1.0, b"a".to_vec());
    zadd!(value, 2.0, b"b".to_vec());
    zadd!(value, 3.0, b"c".to_vec());
    let min = parse_bound(b"(1").unwrap();
    let max = parse_bound(b"+inf").unwrap();
    assert_eq!(value.zcount(min, max).unwrap(), 2);
    assert!(parse_bound(b"one").is_err());
    assert!(parse_bound(b"(").is_err());
    assert!(parse_bound(&[0xff]).is_err());
}

#[test]
fn zremrangebyscore() {
    let mut value = zset();
    for i in 0..20u8 {
        zadd!(value, (i / 2) as f64, vec![i]);
    }
    assert_eq!(value.zremrangebyscore(Bound::Excluded(2.0), Bound::Included(5.0)).unwrap(), 6);
    assert_eq!(value.zcard(), 14);
    assert_eq!(value.zscore(&[6]), None);
    assert_eq!(value.zscore(&[5]), Some(2.0));
    assert_eq!(value.zrank(&[12]), Some(6));
    assert_eq!(value.zremrangebyscore(Bound::Excluded(2.0), Bound::Included(5.0)).unwrap(), 0);
}

#[test]
fn zremrangebyrank() {
    let mut value = zset();
    for i in 0..20u8 {
        zadd!(value, i as f64, vec![i]);
    }
    assert_eq!(value.zremrangebyrank(-5, 100).unwrap(), 5);
    assert_eq!(value.zremrangebyrank(0, 4).unwrap(), 5);
    assert_eq!(value.zrange(0, 0, false, false), vec![vec![5]]);
    assert_eq!(value.zremrangebyrank(7, 3).unwrap(), 0);
    assert_eq!(value.zcard(), 10);
}

#[test]
fn clone_is_independent() {
    let mut value = zset();
    for i in 0..30u8 {
        zadd!(value, i as f64, vec![i]);
    }
    let mut copy = value.clone();
    assert!(copy == value);
    copy.zrem(&[3]).unwrap();
    assert!(copy != value);
    assert_eq!(value.zrank(&[3]), Some(3));
    copy.check().unwrap();
    value.check().unwrap();
}

#[test]
fn iter_in_score_order() {
    let mut value = zset();
    zadd!(value, 2.0, b"b".to_vec());
    zadd!(value, 1.0, b"z".to_vec());
    zadd!(value, 2.0, b"a".to_vec());
    let members: Vec<_> = value.iter().map(|(m, s)| (m.clone(), *s)).collect();
    assert_eq!(members, vec![(b"z".to_vec(), 1.0), (b"a".to_vec(), 2.0), (b"b".to_vec(), 2.0)]);
}

#[test]
fn infinite_bounds_keep_their_side() {
    let mut value = zset();
    zadd!(value, std::f64::NEG_INFINITY, b"low".to_vec());
    zadd!(value, 1.0, b"a".to_vec());
    zadd!(value, 2.0, b"b".to_vec());
    zadd!(value, std::f64::INFINITY, b"high".to_vec());
    let bound = |s: &[u8]| parse_bound(s).unwrap();

    assert_eq!(value.zcount(bound(b"-inf"), bound(b"+inf")).unwrap(), 4);
    assert_eq!(value.zcount(bound(b"+inf"), bound(b"-inf")).unwrap(), 0);
    assert_eq!(value.zcount(bound(b"+inf"), bound(b"+inf")).unwrap(), 1);
    assert_eq!(value.zcount(bound(b"-inf"), bound(b"-inf")).unwrap(), 1);
    assert_eq!(value.zcount(bound(b"(-inf"), bound(b"(+inf")).unwrap(), 2);
    assert!(!value.zany(bound(b"+inf"), bound(b"-inf")).unwrap());
    assert_eq!(
        value.zrangebyscore(bound(b"+inf"), bound(b"-inf"), false, 0, usize::MAX, true).unwrap(),
        vec![b"high".to_vec(), b"b".to_vec(), b"a".to_vec(), b"low".to_vec()]
    );
}

#[test]
fn zrange_near_the_tail() {
    let mut value = zset();
    value.set_verify_invariants(false);
    for i in 0..5000u32 {
        zadd!(value, i as f64, i.to_be_bytes().to_vec());
    }
    for i in (0..5000u32).step_by(7) {
        value.zrem(&i.to_be_bytes()).unwrap();
    }
    let len = value.zcard() as i64;
    let last = value.zrange(-3, -1, false, false);
    assert_eq!(last, vec![
            4996u32.to_be_bytes().to_vec(),
            4997u32.to_be_bytes().to_vec(),
            4999u32.to_be_bytes().to_vec(),
            ]);
    assert_eq!(value.zrange(len - 1, len + 10, false, false).len(), 1);
    assert_eq!(value.zrangebyscore(Bound::Included(4990.0), Bound::Unbounded, false, 2, usize::MAX, false).unwrap().len(), 6);
    value.check().unwrap();
}
