/*!

This is the long-form manual for `quota_rcv` and `rcvsim`.

## Tabulation rules

Every ballot ranks some of the candidates, best first. A ranking always starts in the
first position and has no gaps: once a position is left blank, all the following ones
are blank too.

The count proceeds in rounds:

1. Every ballot counts for its highest-ranked candidate that is still running. A ballot
   whose ranked candidates are all gone is *exhausted* and stops counting. `N` is the
   number of ballots still counting.
2. The threshold is `N / (k + 1)`, rounded up, with `k` the number of seats. It is
   recomputed every round, so it goes down as ballots exhaust.
3. If the leading candidate reaches the threshold, the leader is elected together with
   every candidate tied with them, up to the number of seats still open.
4. Otherwise all the candidates tied for the fewest votes are eliminated. If they are
   all the candidates still running, only one of them is eliminated. A candidate that
   no ballot currently ranks first is still running, and may receive the ballots of
   the eliminated candidates.

The count stops when all the seats are filled. If every ballot is exhausted before that,
the election fails with `InsufficientBallots` and reports the winners found so far.

A ballot whose candidate is elected moves on whole to its next choice: there are no
fractional transfers. Candidates that no ballot ranks first do not appear in a round's
tally.

### Tie breaks

When a tie has to be broken (more tied leaders than open seats, or a single elimination
among tied candidates), the candidates are ordered by one of the following modes:

* `candidateLabel` (default): alphabetical order of the names. The first one wins and
  the last one is eliminated.
* `useCandidateOrder`: the order in which the candidates were registered.
* `random`: a permutation derived from a seed and the round number. The same seed
  always produces the same results.

## Command line

Without any argument, `rcvsim` runs a simulated election: 8 candidates, 10,000 random
ballots, 1 seat.

```text
rcvsim --winners 3 --num-candidates 5 --seed 42 --out stdout
rcvsim --input ballots.csv --candidates A,B,C --winners 2
rcvsim --config election.json --reference expected_summary.json
```

Flags given on the command line take precedence over the configuration file.
`--show-ballots` prints every ballot along with randomly drawn challenge annotations.
These annotations are only displayed, they never change the results.

## Input formats

### `random`

Ballots are drawn one position at a time among the candidates not ranked yet, in
proportion to their `popularity` (1 by default). After the first position, the voter
may also stop ranking, with weight `stopWeight` (1 by default).

### `csv`

Each row is one ballot, each column (in order) is a choice. Empty cells are unranked.

```text
id,choice 1,choice 2,choice 3
id1,A,B,C
id2,B,,
```

The `id` column and the header row are optional: see the `idColumnIndex`,
`firstVoteColumnIndex` and `firstVoteRowIndex` settings below. Rows may be shorter than
the number of candidates. If no candidates are configured, they are the labels found in
the file, sorted.

## Configuration

The configuration is a JSON file:

```json
{
  "outputSettings": {
    "contestName": "Board election",
    "outputDirectory": "output",
    "contestDate": "2026-05-01",
    "contestJurisdiction": "",
    "contestOffice": ""
  },
  "ballotSource": {
    "provider": "csv",
    "filePath": "ballots.csv",
    "firstVoteColumnIndex": 2,
    "firstVoteRowIndex": 2,
    "idColumnIndex": "A"
  },
  "candidates": [{ "name": "A" }, { "name": "B" }, { "name": "C" }],
  "rules": {
    "numberOfWinners": 2,
    "tiebreakMode": "random",
    "randomSeed": "1234"
  },
  "challenges": { "percentChallenged": 5 }
}
```

Column and row indices start at 1. Columns may also be given as letters, as in a
spreadsheet (`"A"`, `"AA"`). For the `random` provider, `ballotSource` takes
`numBallots`, `seed` and `stopWeight`, and candidates may carry a `popularity`.

File paths are relative to the directory of the configuration file. The summary is
written to `outputDirectory/summary.json` unless `--out` is given.

## Summary

The summary follows the layout of the RCVTab summaries, so it can be loaded in RCVis:

```json
{
  "config": { "contest": "Board election", "threshold": "2", "ballotDigest": "..." },
  "winners": ["A", "B"],
  "results": [
    {
      "round": 1,
      "tally": { "A": "3", "B": "1", "C": "1" },
      "tallyResults": [{ "elected": "A", "transfers": { "B": "2", "C": "1" } }]
    }
  ]
}
```

The transfers list where the ballots of an elected or eliminated candidate go in the
next round, with `exhausted` for the ballots that stop counting. Nothing is transferred
after the last round.

 */
