//! Precomputed per-bin entropy contributions.
//!
//! Entry `n` is `n * log2(1024 / n)` in units of 1/1024 bit, i.e. the number of bits that `n`
//! samples out of a packet of 1024 cost when their symbol has probability `n / 1024`. Entry 0
//! is 0. The largest entry just exceeds 19 bits.

use crate::PACKET_NSAMPLES;

/// Entropy contribution of a bin holding `n` counts, scaled by 1024.
pub const ENTROPY_TABLE: [u32; PACKET_NSAMPLES] = [
         0,  10240,  18432,  25851,  32768,  39312,  45558,  51557,
     57344,  62946,  68383,  73673,  78828,  83860,  88778,  93590,
     98304, 102925, 107460, 111912, 116287, 120588, 124818, 128981,
    133080, 137117, 141095, 145017, 148884, 152697, 156460, 160174,
    163840, 167460, 171035, 174567, 178056, 181504, 184913, 188282,
    191614, 194909, 198167, 201391, 204580, 207735, 210858, 213949,
    217008, 220036, 223035, 226003, 228943, 231854, 234738, 237594,
    240423, 243226, 246003, 248754, 251481, 254182, 256860, 259514,
    262144, 264751, 267336, 269898, 272438, 274956, 277453, 279929,
    282384, 284818, 287232, 289627, 292001, 294356, 296692, 299009,
    301308, 303588, 305849, 308093, 310318, 312527, 314717, 316891,
    319048, 321188, 323311, 325418, 327508, 329583, 331642, 333684,
    335712, 337724, 339721, 341702, 343669, 345621, 347559, 349481,
    351390, 353284, 355165, 357031, 358883, 360722, 362548, 364360,
    366158, 367943, 369716, 371475, 373222, 374955, 376676, 378385,
    380081, 381765, 383437, 385096, 386744, 388380, 390003, 391616,
    393216, 394805, 396382, 397949, 399503, 401047, 402580, 404101,
    405612, 407111, 408600, 410078, 411546, 413003, 414450, 415886,
    417312, 418727, 420132, 421528, 422913, 424288, 425653, 427009,
    428355, 429691, 431017, 432334, 433641, 434938, 436227, 437506,
    438775, 440036, 441287, 442529, 443762, 444986, 446201, 447408,
    448605, 449793, 450973, 452144, 453307, 454461, 455606, 456743,
    457871, 458991, 460103, 461207, 462302, 463389, 464467, 465538,
    466601, 467655, 468702, 469740, 470771, 471794, 472809, 473816,
    474816, 475808, 476792, 477768, 478737, 479699, 480653, 481599,
    482538, 483470, 484394, 485311, 486221, 487124, 488019, 488907,
    489788, 490662, 491529, 492388, 493241, 494087, 494926, 495758,
    496583, 497401, 498213, 499017, 499815, 500607, 501391, 502169,
    502940, 503705, 504463, 505214, 505960, 506698, 507430, 508156,
    508875, 509588, 510295, 510995, 511689, 512377, 513058, 513733,
    514403, 515065, 515722, 516373, 517018, 517656, 518289, 518915,
    519536, 520151, 520759, 521362, 521959, 522550, 523135, 523714,
    524288, 524856, 525418, 525974, 526525, 527070, 527609, 528143,
    528671, 529193, 529710, 530221, 530727, 531227, 531722, 532211,
    532695, 533174, 533647, 534114, 534576, 535033, 535485, 535931,
    536372, 536808, 537238, 537663, 538083, 538498, 538908, 539312,
    539711, 540105, 540494, 540878, 541257, 541631, 541999, 542363,
    542722, 543076, 543424, 543768, 544107, 544441, 544770, 545094,
    545413, 545728, 546037, 546342, 546642, 546937, 547227, 547512,
    547793, 548069, 548341, 548608, 548870, 549127, 549379, 549627,
    549871, 550109, 550343, 550573, 550798, 551018, 551234, 551446,
    551652, 551854, 552052, 552246, 552435, 552619, 552799, 552974,
    553146, 553313, 553475, 553633, 553786, 553936, 554081, 554221,
    554358, 554490, 554617, 554741, 554860, 554975, 555086, 555193,
    555295, 555393, 555487, 555577, 555662, 555744, 555821, 555894,
    555963, 556028, 556089, 556146, 556199, 556247, 556292, 556333,
    556369, 556402, 556430, 556455, 556475, 556492, 556505, 556513,
    556518, 556519, 556516, 556509, 556498, 556483, 556464, 556442,
    556415, 556385, 556351, 556313, 556272, 556226, 556177, 556123,
    556067, 556006, 555941, 555873, 555802, 555726, 555647, 555564,
    555477, 555386, 555292, 555194, 555092, 554987, 554879, 554766,
    554650, 554531, 554407, 554280, 554150, 554016, 553878, 553737,
    553592, 553444, 553292, 553136, 552977, 552815, 552649, 552479,
    552306, 552130, 551950, 551767, 551580, 551389, 551196, 550999,
    550798, 550594, 550387, 550176, 549961, 549744, 549523, 549298,
    549071, 548840, 548605, 548367, 548126, 547882, 547634, 547383,
    547128, 546871, 546610, 546346, 546078, 545807, 545533, 545256,
    544975, 544691, 544404, 544114, 543820, 543524, 543224, 542921,
    542615, 542305, 541992, 541676, 541357, 541035, 540710, 540381,
    540050, 539715, 539377, 539036, 538693, 538345, 537995, 537642,
    537285, 536926, 536563, 536197, 535829, 535457, 535082, 534704,
    534323, 533939, 533553, 533163, 532770, 532374, 531975, 531573,
    531168, 530760, 530349, 529935, 529519, 529099, 528676, 528250,
    527822, 527390, 526956, 526519, 526078, 525635, 525189, 524740,
    524288, 523833, 523375, 522915, 522452, 521985, 521516, 521045,
    520570, 520092, 519611, 519128, 518642, 518153, 517661, 517167,
    516669, 516169, 515666, 515160, 514652, 514140, 513627, 513109,
    512590, 512068, 511542, 511015, 510484, 509951, 509414, 508876,
    508335, 507790, 507243, 506693, 506141, 505586, 505028, 504468,
    503905, 503339, 502771, 502200, 501625, 501049, 500470, 499888,
    499304, 498717, 498127, 497535, 496940, 496343, 495743, 495139,
    494534, 493926, 493316, 492703, 492087, 491468, 490848, 490224,
    489598, 488970, 488338, 487705, 487069, 486430, 485788, 485144,
    484498, 483849, 483198, 482543, 481887, 481228, 480567, 479902,
    479236, 478567, 477895, 477221, 476545, 475866, 475184, 474500,
    473814, 473125, 472434, 471740, 471044, 470345, 469644, 468940,
    468234, 467526, 466815, 466102, 465386, 464668, 463948, 463225,
    462499, 461771, 461041, 460309, 459574, 458837, 458097, 457355,
    456611, 455864, 455115, 454364, 453610, 452854, 452095, 451334,
    450571, 449805, 449037, 448267, 447494, 446720, 445943, 445163,
    444381, 443597, 442811, 442022, 441231, 440437, 439642, 438844,
    438044, 437242, 436437, 435630, 434820, 434009, 433195, 432379,
    431561, 430740, 429917, 429092, 428265, 427435, 426603, 425770,
    424933, 424095, 423254, 422411, 421566, 420719, 419869, 419017,
    418163, 417307, 416449, 415588, 414725, 413861, 412993, 412125,
    411253, 410379, 409504, 408625, 407746, 406863, 405979, 405092,
    404203, 403313, 402420, 401524, 400627, 399728, 398826, 397922,
    397016, 396108, 395198, 394287, 393372, 392455, 391537, 390616,
    389694, 388769, 387842, 386913, 385982, 385049, 384113, 383176,
    382236, 381295, 380351, 379406, 378458, 377508, 376557, 375602,
    374647, 373689, 372728, 371766, 370803, 369836, 368868, 367898,
    366926, 365951, 364974, 363997, 363016, 362033, 361049, 360062,
    359075, 358084, 357091, 356097, 355100, 354102, 353101, 352099,
    351095, 350088, 349080, 348069, 347057, 346042, 345026, 344008,
    342988, 341966, 340941, 339915, 338887, 337857, 336825, 335792,
    334756, 333718, 332678, 331636, 330593, 329547, 328500, 327450,
    326399, 325346, 324290, 323233, 322174, 321113, 320051, 318985,
    317919, 316851, 315780, 314708, 313633, 312557, 311479, 310399,
    309317, 308234, 307148, 306060, 304971, 303880, 302787, 301692,
    300595, 299496, 298395, 297293, 296189, 295082, 293975, 292865,
    291753, 290639, 289524, 288407, 287288, 286167, 285044, 283920,
    282793, 281665, 280534, 279403, 278269, 277134, 275996, 274857,
    273716, 272573, 271429, 270282, 269134, 267984, 266832, 265679,
    264523, 263366, 262207, 261046, 259884, 258719, 257554, 256385,
    255216, 254045, 252871, 251696, 250519, 249341, 248160, 246978,
    245794, 244609, 243422, 242232, 241042, 239849, 238655, 237459,
    236261, 235061, 233860, 232657, 231452, 230246, 229037, 227827,
    226616, 225402, 224187, 222970, 221752, 220531, 219309, 218085,
    216860, 215633, 214404, 213173, 211941, 210707, 209471, 208234,
    206994, 205753, 204512, 203267, 202022, 200774, 199525, 198274,
    197021, 195767, 194511, 193254, 191994, 190733, 189471, 188206,
    186940, 185673, 184403, 183132, 181860, 180586, 179310, 178032,
    176753, 175472, 174189, 172905, 171620, 170332, 169043, 167752,
    166460, 165166, 163870, 162573, 161274, 159973, 158671, 157367,
    156062, 154755, 153447, 152136, 150824, 149510, 148196, 146879,
    145560, 144241, 142919, 141596, 140271, 138945, 137618, 136288,
    134957, 133624, 132290, 130954, 129616, 128277, 126936, 125595,
    124250, 122905, 121558, 120210, 118860, 117508, 116155, 114800,
    113444, 112086, 110726, 109366, 108003, 106638, 105273, 103905,
    102537, 101166,  99795,  98421,  97046,  95669,  94291,  92912,
     91530,  90147,  88763,  87377,  85990,  84601,  83211,  81819,
     80425,  79030,  77634,  76236,  74836,  73435,  72032,  70628,
     69223,  67816,  66407,  64996,  63585,  62172,  60757,  59341,
     57923,  56504,  55083,  53661,  52238,  50813,  49386,  47957,
     46528,  45096,  43664,  42230,  40794,  39357,  37918,  36478,
     35037,  33594,  32149,  30703,  29256,  27807,  26356,  24905,
     23452,  21997,  20540,  19083,  17624,  16162,  14701,  13238,
     11772,  10306,   8838,   7369,   5898,   4425,   2952,   1477,
];

/// Rescales a table entry to `1/nbins`-bit units with rounding, so that summing up to `nbins`
/// entries stays within the width the histogram reserves for its estimate.
#[inline(always)]
pub fn scaled_entropy(count: usize, nbins: usize) -> u32 {
    let unit = (PACKET_NSAMPLES / nbins) as u32;
    (ENTROPY_TABLE[count] + unit / 2) / unit
}
