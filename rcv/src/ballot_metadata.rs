//! Information about the contest, such as candidates.

use serde::{Serialize,Deserialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Sub;

/// a candidate, referred to by position in the tabulation roster, 0 being first
#[derive(Clone, Copy, PartialEq, Eq, Hash,Ord, PartialOrd,Serialize,Deserialize)]
pub struct CandidateIndex(pub usize);
// type alias really, don't want long display
impl fmt::Display for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// Represent a number of candidates. E.g. number of seats, number of remaining seats.
#[derive(Clone, Copy, PartialEq, Eq, Hash,Serialize,Deserialize,Ord, PartialOrd)]
pub struct NumberOfCandidates(pub usize);

// type alias really, don't want long display
impl fmt::Display for NumberOfCandidates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for NumberOfCandidates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

impl Sub for NumberOfCandidates {
    type Output = NumberOfCandidates;
    fn sub(self, rhs: Self) -> Self::Output { NumberOfCandidates(self.0-rhs.0) }
}

/// The index of a tabulation round, 1 being the first. Distinct from [CandidateIndex]
/// so that one cannot be accidentally used for the other.
#[derive(Copy,Clone,Debug,Ord, PartialOrd, Eq, PartialEq,Hash,Serialize,Deserialize)]
pub struct RoundIndex(pub usize);

impl fmt::Display for RoundIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{}",self.0)
    }
}

/// information about a candidate in the contest.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct Candidate {
    pub name : String,
    /// Vendor or jurisdiction internal identifier.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub code : Option<String>,
    /// Declared but not eligible, e.g. withdrew after the ballots were printed.
    #[serde(skip_serializing_if = "is_false",default)]
    pub excluded : bool,
}

pub(crate) fn is_false(b:&bool) -> bool { !*b }

impl Candidate {
    pub fn new(name:&str) -> Self { Candidate{name:name.to_string(),code:None,excluded:false} }
}

/// The candidates a tabulation actually counts votes for: every declared, non-excluded
/// candidate in declaration order, with the undeclared write in bucket appended at the
/// end should the rules call for one. All iteration whose order is observable in the
/// output goes through this order, never through a hash ordered collection.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct CandidateRoster {
    names : Vec<String>,
    /// index of the undeclared write in bucket, if the contest has one.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    uwi : Option<CandidateIndex>,
}

impl CandidateRoster {
    pub fn new(names:Vec<String>,uwi_label:Option<&str>) -> Self {
        let mut names = names;
        let uwi = match uwi_label {
            Some(label) => { names.push(label.to_string()); Some(CandidateIndex(names.len()-1)) }
            None => None,
        };
        CandidateRoster{names,uwi}
    }

    pub fn len(&self) -> usize { self.names.len() }
    pub fn is_empty(&self) -> bool { self.names.is_empty() }
    pub fn name(&self,index:CandidateIndex) -> &str { &self.names[index.0] }
    pub fn undeclared_write_in(&self) -> Option<CandidateIndex> { self.uwi }
    pub fn is_undeclared_write_in(&self,index:CandidateIndex) -> bool { self.uwi==Some(index) }

    /// An iterator over all the candidate indices starting at 0, in roster order.
    pub fn indices(&self) -> impl Iterator<Item=CandidateIndex> { (0..self.names.len()).map(CandidateIndex) }

    /// Get a hashmap going from candidate name to index. Used by callers translating
    /// parsed ballot text into indices; lookup only, never iterated.
    pub fn name_lookup(&self) -> HashMap<String,CandidateIndex> {
        let mut res = HashMap::default();
        for i in 0..self.names.len() {
            res.insert(self.names[i].clone(),CandidateIndex(i));
        }
        res
    }

    pub fn list_to_string(&self,list : &[CandidateIndex]) -> String {
        list.iter().map(|&c|self.name(c)).collect::<Vec<_>>().join(", ")
    }
}
